//! Reconciliation engine - probe, decide, synthesize, execute

use crate::context::ApplyContext;
use crate::diff::{decide, describe_changes};
use crate::resource::{Resource, redact};
use crate::types::{Action, DesiredState, Reconciliation};
use anyhow::{Context, Result};

/// Reconcile one resource against the live system
///
/// The probe always runs. When the resource is already converged no
/// command is synthesized or issued. In check mode the commands are
/// rendered and reported but never executed.
pub fn reconcile(resource: &dyn Resource, ctx: &mut ApplyContext) -> Result<Reconciliation> {
    let desired = resource.desired();
    let observed = resource
        .current_state(ctx)
        .with_context(|| format!("Failed to inspect {} {}", resource.kind(), resource.id()))?;

    let action = decide(&desired, &observed);
    log::debug!(
        "{} {}: desired {}, observed {}, action {:?}",
        resource.resource_type(),
        resource.id(),
        desired.state,
        if observed.is_present() { "present" } else { "absent" },
        action
    );

    if !action.is_change() {
        let msg = message(resource, &Action::NoOp, desired.state, false);
        return Ok(Reconciliation {
            action: Some(action),
            ..Reconciliation::unchanged(msg)
        });
    }

    let commands = resource.synthesize(&action, &observed)?;
    let secrets = resource.secrets();
    let reported: Vec<String> = commands.iter().map(|c| redact(c, &secrets)).collect();

    if ctx.check_mode {
        let msg = message(resource, &action, desired.state, true);
        return Ok(Reconciliation {
            action: Some(action),
            ..Reconciliation::changed(msg).with_commands(reported)
        });
    }

    let level = if ctx.verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    };
    for command in &reported {
        log::log!(level, "{} {}: {}", resource.resource_type(), resource.id(), command);
    }

    resource.execute(&action, &commands, ctx)?;
    log::info!("{} {}: {:?} applied", resource.resource_type(), resource.id(), action);

    let msg = message(resource, &action, desired.state, false);
    Ok(Reconciliation {
        action: Some(action),
        ..Reconciliation::changed(msg)
    })
}

/// Build the human-readable outcome message
fn message(
    resource: &dyn Resource,
    action: &Action,
    desired: DesiredState,
    predicted: bool,
) -> String {
    let kind = resource.kind();
    let id = resource.id();
    let location = resource.location();
    let verb = |done: &'static str, would: &'static str| if predicted { would } else { done };

    match action {
        Action::NoOp => match desired {
            DesiredState::Present => format!("{kind} {id} already exists on {location}."),
            DesiredState::Absent => {
                format!("{kind} {id} does not exist on {location}; no action needed.")
            }
        },
        Action::Create => format!(
            "{kind} {id} {} on {location}.",
            verb("has been created", "would be created")
        ),
        Action::Modify { changes } => format!(
            "{kind} {id} {} on {location} ({}).",
            verb("has been modified", "would be modified"),
            describe_changes(changes)
        ),
        Action::Drop => format!(
            "{kind} {id} {} from {location}.",
            verb("has been removed", "would be removed")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attributes, Desired, ResourceState};
    use std::cell::RefCell;

    #[derive(Debug)]
    struct FakeUser {
        name: String,
        want: DesiredState,
        exists: bool,
        executed: RefCell<Vec<Vec<String>>>,
    }

    impl FakeUser {
        fn new(name: &str, want: DesiredState, exists: bool) -> Self {
            Self {
                name: name.to_string(),
                want,
                exists,
                executed: RefCell::new(Vec::new()),
            }
        }
    }

    impl Resource for FakeUser {
        fn id(&self) -> String {
            self.name.clone()
        }

        fn kind(&self) -> &'static str {
            "User"
        }

        fn resource_type(&self) -> &'static str {
            "test_user"
        }

        fn desired(&self) -> Desired {
            match self.want {
                DesiredState::Present => Desired::present(Attributes::new()),
                DesiredState::Absent => Desired::absent(),
            }
        }

        fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
            Ok(if self.exists {
                ResourceState::present()
            } else {
                ResourceState::Absent
            })
        }

        fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
            Ok(match action {
                Action::Create => {
                    vec![format!("CREATE USER {} IDENTIFIED BY \"Secret1\"", self.name)]
                }
                Action::Drop => vec![format!("DROP USER {} CASCADE", self.name)],
                _ => Vec::new(),
            })
        }

        fn execute(
            &self,
            _action: &Action,
            commands: &[String],
            _ctx: &mut ApplyContext,
        ) -> Result<()> {
            self.executed.borrow_mut().push(commands.to_vec());
            Ok(())
        }

        fn secrets(&self) -> Vec<String> {
            vec!["Secret1".to_string()]
        }
    }

    #[test]
    fn absent_missing_user_is_unchanged() {
        let user = FakeUser::new("TESTUSER", DesiredState::Absent, false);
        let result = reconcile(&user, &mut ApplyContext::default()).unwrap();

        assert!(!result.changed);
        assert_eq!(
            result.msg,
            "User TESTUSER does not exist on the database; no action needed."
        );
        assert!(user.executed.borrow().is_empty());
    }

    #[test]
    fn present_existing_user_is_unchanged() {
        let user = FakeUser::new("TESTUSER", DesiredState::Present, true);
        let result = reconcile(&user, &mut ApplyContext::default()).unwrap();

        assert!(!result.changed);
        assert!(user.executed.borrow().is_empty());
    }

    #[test]
    fn present_missing_user_executes_once() {
        let user = FakeUser::new("TESTUSER", DesiredState::Present, false);
        let result = reconcile(&user, &mut ApplyContext::default()).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Some(Action::Create));
        assert_eq!(user.executed.borrow().len(), 1);
        assert_eq!(result.msg, "User TESTUSER has been created on the database.");
    }

    #[test]
    fn check_mode_reports_redacted_commands_without_executing() {
        let user = FakeUser::new("TESTUSER", DesiredState::Present, false);
        let mut ctx = ApplyContext::new(true, false);
        let result = reconcile(&user, &mut ctx).unwrap();

        assert!(result.changed);
        assert!(user.executed.borrow().is_empty());
        assert_eq!(
            result.commands,
            vec!["CREATE USER TESTUSER IDENTIFIED BY \"********\"".to_string()]
        );
        assert_eq!(result.msg, "User TESTUSER would be created on the database.");
    }

    #[test]
    fn verbose_run_executes_unredacted_commands() {
        let user = FakeUser::new("TESTUSER", DesiredState::Present, false);
        let mut ctx = ApplyContext::new(false, true);
        let result = reconcile(&user, &mut ctx).unwrap();

        assert!(result.changed);
        assert!(result.commands.is_empty());
        assert_eq!(
            *user.executed.borrow(),
            vec![vec!["CREATE USER TESTUSER IDENTIFIED BY \"Secret1\"".to_string()]]
        );
    }

    #[test]
    fn drop_message_uses_from() {
        let user = FakeUser::new("TESTUSER", DesiredState::Absent, true);
        let result = reconcile(&user, &mut ApplyContext::default()).unwrap();

        assert!(result.changed);
        assert_eq!(result.msg, "User TESTUSER has been removed from the database.");
    }
}
