//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI.

use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates while a plan runs.
pub trait ProgressCallback {
    /// Called when starting a batch of tasks
    fn on_batch_start(&mut self, count: usize);

    /// Called when starting a single task
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a task completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult, msg: &str);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult, _msg: &str) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to resource probe and apply operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Probe and report only, never mutate
    pub check_mode: bool,
    /// Whether to output verbose information
    pub verbose: bool,
}

impl ApplyContext {
    pub fn new(check_mode: bool, verbose: bool) -> Self {
        Self {
            check_mode,
            verbose,
        }
    }
}
