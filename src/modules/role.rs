//! Roles and the privileges granted to them
//!
//! Privileges not listed in the request are left in place.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::grants;
use super::{ModuleContext, ModuleResult, Secret, sql_script};

const GRANTED: &str = "GRANTED";

pub fn params() -> Vec<&'static str> {
    connection::params(Login::Prefixed, &["role", "password", "privileges", "state"])
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Prefixed)?;
    let role = Role::from_args(args, client)?;
    super::reconcile(&role, ctx)
}

#[derive(Debug)]
pub struct Role {
    name: String,
    ident: String,
    password: Option<Secret>,
    privileges: Vec<String>,
    state: DesiredState,
    client: Client,
}

impl Role {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("role")?;
        let ident = quote::identifier(&name, "role")?;

        let password = args.str("password")?;
        if let Some(password) = &password {
            quote::password(password)?;
        }

        let requested = args.list("privileges")?;
        let privileges = if requested.is_empty() {
            Vec::new()
        } else {
            grants::normalize(&requested)?
        };

        Ok(Self {
            name,
            ident,
            password: password.map(Secret::new),
            privileges,
            state: args.state()?,
            client,
        })
    }

    fn grant(&self, privilege: &str) -> String {
        format!("GRANT {} TO {}", privilege, self.ident)
    }
}

impl Resource for Role {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "Role"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_role"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Absent => Desired::absent(),
            DesiredState::Present => Desired::present(
                self.privileges
                    .iter()
                    .map(|p| (p.as_str(), GRANTED))
                    .collect(),
            ),
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let exists = self.client.exists(&format!(
            "SELECT role FROM dba_roles WHERE role = {}",
            quote::literal(&self.ident)?
        ))?;
        if !exists {
            return Ok(ResourceState::Absent);
        }

        let attributes: Attributes = grants::system_and_roles(&self.client, &self.ident)?
            .into_iter()
            .map(|held| (held.privilege, GRANTED))
            .collect();
        Ok(ResourceState::Present { attributes })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let mut create = format!("CREATE ROLE {}", self.ident);
                if let Some(password) = &self.password {
                    create.push_str(" IDENTIFIED BY ");
                    create.push_str(&quote::password(password.expose())?);
                }
                std::iter::once(create)
                    .chain(self.privileges.iter().map(|p| self.grant(p)))
                    .collect()
            }
            Action::Modify { changes } => changes.iter().map(|c| self.grant(&c.key)).collect(),
            Action::Drop => vec![format!("DROP ROLE {}", self.ident)],
        })
    }

    fn execute(&self, _action: &Action, commands: &[String], _ctx: &mut ApplyContext) -> Result<()> {
        self.client.execute(&sql_script(commands))?;
        Ok(())
    }

    fn secrets(&self) -> Vec<String> {
        self.password
            .iter()
            .map(|p| p.expose().to_string())
            .chain(self.client.target().secrets())
            .collect()
    }
}
