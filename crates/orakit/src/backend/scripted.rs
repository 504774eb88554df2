//! Scripted backend for exercising callers without a database.
//!
//! Responses are keyed by a substring of the script. Every invocation is
//! recorded so tests can assert on exactly what would have been sent.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{CommandOutput, OracleEnv, Tool};
use std::sync::Mutex;

/// A recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Tool that was run
    pub tool: Tool,
    /// Script sent on stdin
    pub script: String,
    /// Child environment
    pub env: OracleEnv,
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    output: CommandOutput,
    remaining: Option<usize>,
}

/// Backend returning canned output.
///
/// The first rule whose needle occurs in the script wins. Scripts matching
/// no rule succeed with empty output, which reads as "no rows".
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
    instances: Vec<String>,
}

impl ScriptedBackend {
    /// Backend with no rules and no running instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer scripts containing `needle` with `stdout`.
    pub fn respond(self, needle: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.rule(needle, CommandOutput::ok(stdout), None)
    }

    /// Fail scripts containing `needle` with `stdout` and exit code 1.
    pub fn fail(self, needle: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.rule(needle, CommandOutput::failed(stdout, 1), None)
    }

    /// Fail the first `times` scripts containing `needle`.
    pub fn fail_times(
        self,
        needle: impl Into<String>,
        stdout: impl Into<String>,
        times: usize,
    ) -> Self {
        self.rule(needle, CommandOutput::failed(stdout, 1), Some(times))
    }

    /// Report these SIDs as running.
    pub fn with_instances<I, S>(mut self, sids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instances = sids.into_iter().map(Into::into).collect();
        self
    }

    fn rule(self, needle: impl Into<String>, output: CommandOutput, remaining: Option<usize>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                needle: needle.into(),
                output,
                remaining,
            });
        }
        self
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Scripts containing `needle`.
    pub fn scripts_containing(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.script.contains(needle))
            .map(|c| c.script)
            .collect()
    }
}

impl Backend for ScriptedBackend {
    fn run(&self, tool: Tool, script: &str, env: &OracleEnv) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                tool,
                script: script.to_string(),
                env: env.clone(),
            });
        }

        let Ok(mut rules) = self.rules.lock() else {
            return Ok(CommandOutput::ok(""));
        };
        let hit = rules
            .iter_mut()
            .filter(|r| r.remaining != Some(0))
            .find(|r| script.contains(&r.needle));

        Ok(match hit {
            Some(rule) => {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.output.clone()
            }
            None => CommandOutput::ok(""),
        })
    }

    fn running_instances(&self) -> Result<Vec<String>> {
        Ok(self.instances.clone())
    }
}
