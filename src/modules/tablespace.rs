//! Tablespaces
//!
//! Existence-managed: an existing tablespace is never resized.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult, sql_script};

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Plain,
        &["tablespace", "datafile", "size", "autoextend", "maxsize", "state"],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Plain)?;
    let tablespace = Tablespace::from_args(args, client)?;
    super::reconcile(&tablespace, ctx)
}

#[derive(Debug)]
pub struct Tablespace {
    name: String,
    ident: String,
    datafile: Option<String>,
    size: Option<String>,
    autoextend: bool,
    maxsize: Option<String>,
    state: DesiredState,
    client: Client,
}

impl Tablespace {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("tablespace")?;
        let ident = quote::identifier(&name, "tablespace")?;
        let state = args.state()?;

        let size = args
            .str("size")?
            .map(|s| quote::size(&s, "size"))
            .transpose()?;
        if state == DesiredState::Present && size.is_none() {
            return Err(orakit::Error::validation(
                "size is required when state is present",
            ));
        }

        let autoextend = args.flag("autoextend", false)?;
        let maxsize = args
            .str("maxsize")?
            .map(|s| quote::size_or_unlimited(&s, "maxsize"))
            .transpose()?;
        if maxsize.is_some() && !autoextend {
            return Err(orakit::Error::validation(
                "maxsize requires autoextend to be true",
            ));
        }

        let datafile = args.str("datafile")?.filter(|d| !d.trim().is_empty());
        if let Some(datafile) = &datafile {
            quote::literal(datafile)?;
        }

        Ok(Self {
            name,
            ident,
            datafile,
            size,
            autoextend,
            maxsize,
            state,
            client,
        })
    }
}

impl Resource for Tablespace {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "Tablespace"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_tablespace"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Present => Desired::present(Attributes::new()),
            DesiredState::Absent => Desired::absent(),
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let exists = self.client.exists(&format!(
            "SELECT tablespace_name FROM dba_tablespaces WHERE tablespace_name = {}",
            quote::literal(&self.ident)?
        ))?;
        Ok(if exists {
            ResourceState::present()
        } else {
            ResourceState::Absent
        })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp | Action::Modify { .. } => Vec::new(),
            Action::Create => {
                let size = self.size.as_deref().ok_or_else(|| {
                    orakit::Error::validation("size is required to create a tablespace")
                })?;
                let mut create = format!("CREATE TABLESPACE {} DATAFILE", self.ident);
                if let Some(datafile) = &self.datafile {
                    create.push(' ');
                    create.push_str(&quote::literal(datafile)?);
                }
                create.push_str(&format!(" SIZE {}", size));
                if self.autoextend {
                    create.push_str(" AUTOEXTEND ON");
                    if let Some(maxsize) = &self.maxsize {
                        create.push_str(&format!(" MAXSIZE {}", maxsize));
                    }
                }
                vec![create]
            }
            Action::Drop => vec![format!(
                "DROP TABLESPACE {} INCLUDING CONTENTS AND DATAFILES",
                self.ident
            )],
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
