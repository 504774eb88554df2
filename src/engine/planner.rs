//! Plan files
//!
//! A plan is a TOML file with one `[[task]]` per module run:
//!
//! ```toml
//! [[task]]
//! name = "data tablespace"
//! module = "tablespace"
//! args = { tablespace = "data", size = "1G", autoextend = true }
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::modules::ModuleKind;
use crate::modules::args::ModuleArgs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    #[serde(default, rename = "task")]
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    name: Option<String>,
    module: String,
    #[serde(default)]
    args: toml::Table,
}

/// One resolved task
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub name: String,
    pub kind: ModuleKind,
    pub args: ModuleArgs,
}

/// Tasks in file order
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub tasks: Vec<PlannedTask>,
}

impl ExecutionPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read plan {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid plan {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: PlanFile = toml::from_str(content)?;
        if file.tasks.is_empty() {
            bail!("plan has no [[task]] entries");
        }

        let tasks = file
            .tasks
            .into_iter()
            .enumerate()
            .map(|(i, entry)| resolve(i + 1, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tasks })
    }
}

fn resolve(number: usize, entry: TaskEntry) -> Result<PlannedTask> {
    let Some(kind) = ModuleKind::parse(&entry.module) else {
        bail!("task {}: unknown module '{}'", number, entry.module);
    };
    let value = serde_json::to_value(&entry.args)
        .with_context(|| format!("task {}: args are not representable as JSON", number))?;
    let args = ModuleArgs::from_json(value).with_context(|| format!("task {}", number))?;

    Ok(PlannedTask {
        name: entry
            .name
            .unwrap_or_else(|| format!("{} #{}", kind, number)),
        kind,
        args,
    })
}
