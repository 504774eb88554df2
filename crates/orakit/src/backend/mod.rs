//! Backend abstraction for running Oracle tools.
//!
//! The [`Backend`] trait is the only place that touches processes, allowing
//! for different implementations (real CLI, scripted responses for tests).

pub mod cli;
pub mod scripted;

use crate::error::Result;
use crate::types::{CommandOutput, OracleEnv, Tool};

/// Backend trait for Oracle tool invocations.
///
/// This trait abstracts process execution, enabling:
/// - Real CLI execution via `sqlplus` and `rman`
/// - Scripted implementations for testing
/// - A structured driver replacing text scraping later on
pub trait Backend: Send + Sync {
    /// Run `tool` with `script` on stdin and capture its output.
    ///
    /// Classification of the output is left to the caller.
    fn run(&self, tool: Tool, script: &str, env: &OracleEnv) -> Result<CommandOutput>;

    /// SIDs of the instances running on this host.
    fn running_instances(&self) -> Result<Vec<String>>;
}
