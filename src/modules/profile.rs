//! Profiles and their resource limits
//!
//! Limits are compared against `DBA_PROFILES` as text. Oracle reports some
//! values in a normalized form (`1/24` comes back as `.0416`), so such a
//! limit shows drift on every run.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};
use regex::Regex;
use std::sync::LazyLock;

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult, sql_script};

static LIMIT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(UNLIMITED|DEFAULT|NULL|[0-9]*\.?[0-9]+(/[0-9]+)?[KMG]?)$")
        .expect("limit value regex is valid")
});

pub fn params() -> Vec<&'static str> {
    connection::params(Login::Plain, &["profile", "limits", "state"])
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Plain)?;
    let profile = Profile::from_args(args, client)?;
    super::reconcile(&profile, ctx)
}

#[derive(Debug)]
pub struct Profile {
    name: String,
    ident: String,
    limits: Attributes,
    state: DesiredState,
    client: Client,
}

impl Profile {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("profile")?;
        let ident = quote::identifier(&name, "profile")?;

        let mut limits = Attributes::new();
        for (resource, value) in args.map("limits")? {
            let resource = quote::identifier(&resource, "limit name")?;
            let value = limit_value(&resource, &value)?;
            limits.insert(resource, value);
        }

        Ok(Self {
            name,
            ident,
            limits,
            state: args.state()?,
            client,
        })
    }
}

/// Validate a limit value and return it upper-cased
///
/// Numbers, fractions and sizes are accepted, as are identifiers for
/// `PASSWORD_VERIFY_FUNCTION`.
fn limit_value(resource: &str, value: &str) -> orakit::Result<String> {
    let value = value.trim();
    if LIMIT_VALUE.is_match(value) {
        return Ok(value.to_uppercase());
    }
    quote::identifier(value, &format!("limit {}", resource)).map_err(|_| {
        orakit::Error::validation(format!(
            "limit {} has invalid value '{}'; use a number, a size, UNLIMITED, DEFAULT or a function name",
            resource, value
        ))
    })
}

fn limit_clause(limits: impl Iterator<Item = (String, String)>) -> String {
    limits
        .map(|(k, v)| format!("{} {}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Resource for Profile {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "Profile"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_profile"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Present => Desired::present(self.limits.clone()),
            DesiredState::Absent => Desired::absent(),
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let rows = self.client.query_fields(
            &format!(
                "SELECT resource_name || '|' || limit FROM dba_profiles WHERE profile = {}",
                quote::literal(&self.ident)?
            ),
            2,
        )?;
        if rows.is_empty() {
            return Ok(ResourceState::Absent);
        }

        let attributes = rows
            .into_iter()
            .map(|row| (row[0].to_uppercase(), row[1].to_uppercase()))
            .collect();
        Ok(ResourceState::Present { attributes })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let limits = if self.limits.is_empty() {
                    "COMPOSITE_LIMIT DEFAULT".to_string()
                } else {
                    limit_clause(
                        self.limits
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string())),
                    )
                };
                vec![format!("CREATE PROFILE {} LIMIT {}", self.ident, limits)]
            }
            Action::Modify { changes } => vec![format!(
                "ALTER PROFILE {} LIMIT {}",
                self.ident,
                limit_clause(changes.iter().map(|c| (c.key.clone(), c.to.clone())))
            )],
            Action::Drop => vec![format!("DROP PROFILE {} CASCADE", self.ident)],
        })
    }

    fn execute(&self, _action: &Action, commands: &[String], _ctx: &mut ApplyContext) -> Result<()> {
        self.client.execute(&sql_script(commands))?;
        Ok(())
    }

    fn secrets(&self) -> Vec<String> {
        self.client.target().secrets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing;
    use orakit::backend::scripted::ScriptedBackend;
    use serde_json::json;

    fn args() -> ModuleArgs {
        ModuleArgs::from_json(json!({
            "profile": "app_profile",
            "limits": {
                "sessions_per_user": 5,
                "IDLE_TIME": "30",
                "password_life_time": "unlimited"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_create_keeps_limit_order() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let result = run(&args(), &ctx).unwrap();

        assert!(result.changed);
        let scripts = backend.scripts_containing("CREATE PROFILE");
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains(
            "CREATE PROFILE APP_PROFILE LIMIT SESSIONS_PER_USER 5 IDLE_TIME 30 PASSWORD_LIFE_TIME UNLIMITED;"
        ));
    }

    #[test]
    fn test_only_differing_limits_are_altered() {
        let (backend, ctx) = testing::context(ScriptedBackend::new().respond(
            "FROM dba_profiles",
            "SESSIONS_PER_USER|5\nIDLE_TIME|60\nPASSWORD_LIFE_TIME|UNLIMITED\nCONNECT_TIME|DEFAULT\n",
        ));
        let result = run(&args(), &ctx).unwrap();

        assert!(result.changed);
        assert_eq!(
            result.msg,
            "Profile app_profile has been modified on the database (IDLE_TIME: 60 -> 30)."
        );
        assert_eq!(
            backend
                .scripts_containing("ALTER PROFILE APP_PROFILE LIMIT IDLE_TIME 30;")
                .len(),
            1
        );
    }

    #[test]
    fn test_identical_limits_are_unchanged() {
        let (backend, ctx) = testing::context(ScriptedBackend::new().respond(
            "FROM dba_profiles",
            "SESSIONS_PER_USER|5\nIDLE_TIME|30\nPASSWORD_LIFE_TIME|UNLIMITED\n",
        ));
        assert!(!run(&args(), &ctx).unwrap().changed);
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_profile_without_limits() {
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let args = ModuleArgs::new().with("profile", "empty");
        let result = run(&args, &ctx.with_check_mode(true)).unwrap();
        assert_eq!(
            result.commands,
            vec!["CREATE PROFILE EMPTY LIMIT COMPOSITE_LIMIT DEFAULT"]
        );
    }

    #[test]
    fn test_limit_values() {
        assert_eq!(limit_value("PASSWORD_LOCK_TIME", "1/24").unwrap(), "1/24");
        assert_eq!(limit_value("PRIVATE_SGA", "10k").unwrap(), "10K");
        assert_eq!(limit_value("PASSWORD_GRACE_TIME", ".5").unwrap(), ".5");
        assert_eq!(
            limit_value("PASSWORD_VERIFY_FUNCTION", "ora12c_verify_function").unwrap(),
            "ORA12C_VERIFY_FUNCTION"
        );
        assert!(limit_value("IDLE_TIME", "30; DROP PROFILE X").is_err());
        assert!(limit_value("IDLE_TIME", "").is_err());
    }

    #[test]
    fn test_drop_cascades() {
        let (backend, ctx) = testing::context(
            ScriptedBackend::new().respond("FROM dba_profiles", "IDLE_TIME|30\n"),
        );
        let args = ModuleArgs::new().with("profile", "app_profile").with("state", "absent");
        assert!(run(&args, &ctx).unwrap().changed);
        assert_eq!(
            backend.scripts_containing("DROP PROFILE APP_PROFILE CASCADE;").len(),
            1
        );
    }
}
