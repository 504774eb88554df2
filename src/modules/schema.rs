//! Schema owners
//!
//! A schema is a user created with explicit default and temporary
//! tablespaces and a quota on the default one.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, output, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult, Secret, sql_script};

const DEFAULT_TABLESPACE: &str = "DEFAULT_TABLESPACE";
const TEMPORARY_TABLESPACE: &str = "TEMPORARY_TABLESPACE";

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Prefixed,
        &["schema", "password", "tablespace", "temp_tablespace", "state"],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Prefixed)?;
    let schema = Schema::from_args(args, client)?;
    super::reconcile(&schema, ctx)
}

#[derive(Debug)]
pub struct Schema {
    name: String,
    ident: String,
    password: Option<Secret>,
    tablespace: Option<String>,
    temp_tablespace: Option<String>,
    state: DesiredState,
    client: Client,
}

impl Schema {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("schema")?;
        let ident = quote::identifier(&name, "schema")?;

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
            tablespace: args
                .str("tablespace")?
                .map(|t| quote::identifier(&t, "tablespace"))
                .transpose()?,
            temp_tablespace: args
                .str("temp_tablespace")?
                .map(|t| quote::identifier(&t, "temp_tablespace"))
                .transpose()?,
            state,
            client,
        })
    }
}

impl Resource for Schema {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "Schema"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_schema"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Absent => Desired::absent(),
            DesiredState::Present => {
                let mut attributes = Attributes::new();
                if let Some(t) = &self.tablespace {
                    attributes.insert(DEFAULT_TABLESPACE, t.as_str());
                }
                if let Some(t) = &self.temp_tablespace {
                    attributes.insert(TEMPORARY_TABLESPACE, t.as_str());
                }
                Desired::present(attributes)
            }
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let rows = self.client.query_fields(
            &format!(
                "SELECT default_tablespace || '|' || temporary_tablespace FROM dba_users WHERE username = {}",
                quote::literal(&self.ident)?
            ),
            2,
        )?;

        Ok(match rows.first() {
            None => ResourceState::Absent,
            Some(row) => ResourceState::Present {
                attributes: Attributes::new()
                    .with(DEFAULT_TABLESPACE, row[0].to_uppercase())
                    .with(TEMPORARY_TABLESPACE, row[1].to_uppercase()),
            },
        })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        let schema = &self.ident;
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let password = self.password.as_ref().ok_or_else(|| {
                    orakit::Error::validation("password is required to create a schema")
                })?;
                let mut create = format!(
                    "CREATE USER {} IDENTIFIED BY {}",
                    schema,
                    quote::password(password.expose())?
                );
                if let Some(t) = &self.tablespace {
                    create.push_str(&format!(" DEFAULT TABLESPACE {} QUOTA UNLIMITED ON {}", t, t));
                }
                if let Some(t) = &self.temp_tablespace {
                    create.push_str(&format!(" TEMPORARY TABLESPACE {}", t));
                }
                vec![create, format!("GRANT CONNECT, RESOURCE TO {}", schema)]
            }
            Action::Modify { changes } => changes
                .iter()
                .map(|c| match c.key.as_str() {
                    DEFAULT_TABLESPACE => format!(
                        "ALTER USER {} DEFAULT TABLESPACE {} QUOTA UNLIMITED ON {}",
                        schema, c.to, c.to
                    ),
                    _ => format!("ALTER USER {} TEMPORARY TABLESPACE {}", schema, c.to),
                })
                .collect(),
            Action::Drop => vec![format!("DROP USER {} CASCADE", schema)],
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
