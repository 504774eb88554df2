//! Database users
//!
//! A new user gets `CONNECT` and `RESOURCE`. Passing `locked` manages the
//! account lock; leaving it out leaves the lock alone.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult, Secret, sql_script};

const LOCKED: &str = "LOCKED";

pub fn params() -> Vec<&'static str> {
    connection::params(Login::Prefixed, &["username", "password", "locked", "state"])
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Prefixed)?;
    let user = OracleUser::from_args(args, client)?;
    super::reconcile(&user, ctx)
}

#[derive(Debug)]
pub struct OracleUser {
    name: String,
    ident: String,
    password: Option<Secret>,
    locked: Option<bool>,
    state: DesiredState,
    client: Client,
}

impl OracleUser {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("username")?;
        let ident = quote::identifier(&name, "username")?;
        let state = args.state()?;

        let password = args.str("password")?;
        if let Some(password) = &password {
            quote::password(password)?;
        }
        if state == DesiredState::Present && password.is_none() {
            return Err(orakit::Error::validation(
                "password is required when state is present",
            ));
        }

        Ok(Self {
            name,
            ident,
            password: password.map(Secret::new),
            locked: args.bool("locked")?,
            state,
            client,
        })
    }

    fn lock_clause(locked: bool) -> &'static str {
        if locked { "ACCOUNT LOCK" } else { "ACCOUNT UNLOCK" }
    }
}

impl Resource for OracleUser {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "User"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_user"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Absent => Desired::absent(),
            DesiredState::Present => {
                let mut attributes = Attributes::new();
                if let Some(locked) = self.locked {
                    attributes.insert(LOCKED, yes_no(locked));
                }
                Desired::present(attributes)
            }
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let rows = self.client.query(&format!(
            "SELECT account_status FROM dba_users WHERE username = {}",
            quote::literal(&self.ident)?
        ))?;

        Ok(match rows.first() {
            None => ResourceState::Absent,
            Some(status) => ResourceState::Present {
                attributes: Attributes::new()
                    .with(LOCKED, yes_no(status.to_uppercase().contains("LOCKED"))),
            },
        })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        let user = &self.ident;
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let password = self.password.as_ref().ok_or_else(|| {
                    orakit::Error::validation("password is required to create a user")
                })?;
                let mut create = format!(
                    "CREATE USER {} IDENTIFIED BY {}",
                    user,
                    quote::password(password.expose())?
                );
                if self.locked == Some(true) {
                    create.push(' ');
                    create.push_str(Self::lock_clause(true));
                }
                vec![create, format!("GRANT CONNECT, RESOURCE TO {}", user)]
            }
            Action::Modify { changes } => changes
                .iter()
                .filter(|c| c.key == LOCKED)
                .map(|c| format!("ALTER USER {} {}", user, Self::lock_clause(c.to == "YES")))
                .collect(),
            Action::Drop => vec![format!("DROP USER {} CASCADE", user)],
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

fn yes_no(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}
