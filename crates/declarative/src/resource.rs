//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{Action, Desired, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Reconciliation is split into three stages so each can be tested alone:
/// - `current_state` probes the live system (read-only)
/// - `synthesize` renders the commands for an action (pure)
/// - `execute` runs previously synthesized commands
///
/// The decision between those stages is [`crate::decide`].
pub trait Resource: fmt::Debug {
    /// Unique identifier for this resource within its type
    ///
    /// Examples: "APP_USER" for a user, "/u01/app/oracle/dbs/initORCL.ora"
    /// for a parameter file.
    fn id(&self) -> String;

    /// Human-readable noun used in messages ("User", "Tablespace")
    fn kind(&self) -> &'static str;

    /// Resource type category, used for grouping ("oracle_user")
    fn resource_type(&self) -> &'static str;

    /// Get the desired state for this resource
    fn desired(&self) -> Desired;

    /// Detect the current state of this resource
    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState>;

    /// Render the commands needed to carry out `action`
    ///
    /// `observed` is the state returned by `current_state`, needed by
    /// actions that only touch part of the resource (revoking only the
    /// privileges actually held, for example).
    fn synthesize(&self, action: &Action, observed: &ResourceState) -> Result<Vec<String>>;

    /// Run synthesized commands against the live system
    fn execute(
        &self,
        action: &Action,
        commands: &[String],
        ctx: &mut ApplyContext,
    ) -> Result<()>;

    /// Values that must never appear in results or logs
    fn secrets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Where the resource lives, used in messages ("the database")
    fn location(&self) -> &'static str {
        "the database"
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource<'a> = Box<dyn Resource + 'a>;

/// Replace every secret in `text` with a fixed mask
pub fn redact(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "********"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_all_occurrences() {
        let secrets = vec!["Hunter2".to_string()];
        assert_eq!(
            redact("CREATE USER A IDENTIFIED BY \"Hunter2\" -- Hunter2", &secrets),
            "CREATE USER A IDENTIFIED BY \"********\" -- ********"
        );
    }

    #[test]
    fn redact_ignores_empty_secrets() {
        let secrets = vec![String::new()];
        assert_eq!(redact("DROP USER A", &secrets), "DROP USER A");
    }
}
