//! System, role and object grants
//!
//! Without `object` the privileges are system privileges or roles; with
//! `object` (`owner.name`) they are object privileges. A grant already held
//! with the admin or grant option is never downgraded.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::grants::{self, Held};
use super::{ModuleContext, ModuleResult, sql_script};

const GRANTED: &str = "GRANTED";
const GRANTED_WITH_OPTION: &str = "GRANTED WITH OPTION";

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Plain,
        &[
            "grantee",
            "privileges",
            "object",
            "with_admin_option",
            "with_grant_option",
            "state",
        ],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Plain)?;
    let grant = Grant::from_args(args, client)?;
    super::reconcile(&grant, ctx)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ObjectName {
    owner: String,
    name: String,
}

#[derive(Debug)]
pub struct Grant {
    grantee: String,
    privileges: Vec<String>,
    object: Option<ObjectName>,
    with_option: bool,
    state: DesiredState,
    client: Client,
}

impl Grant {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let grantee = quote::identifier(&args.required("grantee")?, "grantee")?;
        let privileges = grants::normalize(&args.list("privileges")?)?;

        let object = match args.str("object")? {
            None => None,
            Some(value) => match quote::qualified_name(&value, "object")? {
                (Some(owner), name) => Some(ObjectName { owner, name }),
                (None, _) => {
                    return Err(orakit::Error::validation(format!(
                        "object '{}' must be given as owner.name",
                        value
                    )));
                }
            },
        };

        let admin = args.flag("with_admin_option", false)?;
        let grant = args.flag("with_grant_option", false)?;
        if grant && object.is_none() {
            return Err(orakit::Error::validation(
                "with_grant_option is only valid for object privileges",
            ));
        }
        if admin && object.is_some() {
            return Err(orakit::Error::validation(
                "with_admin_option is only valid for system privileges and roles",
            ));
        }

        Ok(Self {
            grantee,
            privileges,
            object,
            with_option: admin || grant,
            state: args.state()?,
            client,
        })
    }

    fn on_clause(&self) -> String {
        self.object
            .as_ref()
            .map(|o| format!(" ON {}.{}", o.owner, o.name))
            .unwrap_or_default()
    }

    fn grant(&self, privileges: &[&str]) -> String {
        let option = match (&self.object, self.with_option) {
            (_, false) => "",
            (Some(_), true) => " WITH GRANT OPTION",
            (None, true) => " WITH ADMIN OPTION",
        };
        format!(
            "GRANT {}{} TO {}{}",
            privileges.join(", "),
            self.on_clause(),
            self.grantee,
            option
        )
    }

    fn revoke(&self, privileges: &[&str]) -> String {
        format!(
            "REVOKE {}{} FROM {}",
            privileges.join(", "),
            self.on_clause(),
            self.grantee
        )
    }

    fn wanted(&self) -> &'static str {
        if self.with_option {
            GRANTED_WITH_OPTION
        } else {
            GRANTED
        }
    }

    fn observed_value(&self, held: &Held) -> &'static str {
        if self.with_option && held.with_option {
            GRANTED_WITH_OPTION
        } else {
            GRANTED
        }
    }
}

impl Resource for Grant {
    fn id(&self) -> String {
        let on = self
            .object
            .as_ref()
            .map(|o| format!(" on {}.{}", o.owner, o.name))
            .unwrap_or_default();
        format!("{}{} to {}", self.privileges.join(", "), on, self.grantee)
    }

    fn kind(&self) -> &'static str {
        "Grant"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_privilege"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Absent => Desired::absent(),
            DesiredState::Present => Desired::present(
                self.privileges
                    .iter()
                    .map(|p| (p.as_str(), self.wanted()))
                    .collect(),
            ),
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let held = match &self.object {
            None => grants::system_and_roles(&self.client, &self.grantee)?,
            Some(o) => grants::on_object(&self.client, &self.grantee, &o.owner, &o.name)?,
        };

        let attributes: Attributes = self
            .privileges
            .iter()
            .filter_map(|p| {
                held.iter()
                    .find(|h| &h.privilege == p)
                    .map(|h| (p.as_str(), self.observed_value(h)))
            })
            .collect();

        Ok(if attributes.is_empty() {
            ResourceState::Absent
        } else {
            ResourceState::Present { attributes }
        })
    }

    fn synthesize(&self, action: &Action, observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let all: Vec<&str> = self.privileges.iter().map(String::as_str).collect();
                vec![self.grant(&all)]
            }
            Action::Modify { changes } => {
                let missing: Vec<&str> = changes.iter().map(|c| c.key.as_str()).collect();
                vec![self.grant(&missing)]
            }
            Action::Drop => {
                let held: Vec<&str> = observed
                    .attributes()
                    .map(|a| a.keys().collect())
                    .unwrap_or_default();
                vec![self.revoke(&held)]
            }
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
