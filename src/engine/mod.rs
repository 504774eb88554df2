//! Execution engine for plan files
//!
//! The engine orchestrates:
//! 1. Planning - Read `[[task]]` entries and resolve their modules
//! 2. Previewing - Run every task in check mode and show the outcome
//! 3. Executing - Run tasks in order, stopping at the first failure

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, PromptConfirm, TerminalProgress, execute};
pub use planner::ExecutionPlan;
