//! Module catalogue
//!
//! Each module turns a flat argument record into one reconciliation against
//! an Oracle instance and reports a [`ModuleResult`]. State-bearing modules
//! implement [`declarative::Resource`] and go through
//! [`declarative::reconcile`]; one-shot modules (startup, shutdown, backup,
//! restore, instances) run their own probe and command.

pub mod args;
pub mod backup;
pub mod connection;
pub mod grants;
pub mod instances;
pub mod job;
pub mod param;
pub mod privilege;
pub mod profile;
pub mod restore;
pub mod role;
pub mod schema;
pub mod shutdown;
pub mod startup;
pub mod tablespace;
pub mod user;

use anyhow::Result;
use clap::ValueEnum;
use declarative::{Action, ApplyContext, ApplyResult, Reconciliation, Resource};
use orakit::backend::Backend;
use orakit::{Client, ConnectTarget, ErrorCategory, OracleEnv, SqlScript};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use args::ModuleArgs;

/// Available modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ModuleKind {
    User,
    Schema,
    Role,
    Profile,
    Tablespace,
    Privilege,
    Job,
    Param,
    Startup,
    Shutdown,
    Backup,
    Restore,
    Instances,
}

impl ModuleKind {
    pub const ALL: [Self; 13] = [
        Self::User,
        Self::Schema,
        Self::Role,
        Self::Profile,
        Self::Tablespace,
        Self::Privilege,
        Self::Job,
        Self::Param,
        Self::Startup,
        Self::Shutdown,
        Self::Backup,
        Self::Restore,
        Self::Instances,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Schema => "schema",
            Self::Role => "role",
            Self::Profile => "profile",
            Self::Tablespace => "tablespace",
            Self::Privilege => "privilege",
            Self::Job => "job",
            Self::Param => "param",
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Instances => "instances",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::User => "Create, lock, unlock or drop a database user",
            Self::Schema => "Manage a schema owner and its default tablespaces",
            Self::Role => "Manage a role and the privileges granted to it",
            Self::Profile => "Manage a profile and its resource limits",
            Self::Tablespace => "Create or drop a tablespace",
            Self::Privilege => "Grant or revoke system, role or object privileges",
            Self::Job => "Manage a DBMS_SCHEDULER job",
            Self::Param => "Manage PFILE/SPFILE parameter files",
            Self::Startup => "Start an instance",
            Self::Shutdown => "Shut an instance down",
            Self::Backup => "Run an RMAN backup",
            Self::Restore => "Run an RMAN restore, with retries",
            Self::Instances => "List running instances",
        }
    }

    /// Whether the module reconciles through probe and diff
    pub fn is_stateful(&self) -> bool {
        !matches!(
            self,
            Self::Startup | Self::Shutdown | Self::Backup | Self::Restore | Self::Instances
        )
    }

    /// Every parameter the module accepts
    pub fn params(&self) -> Vec<&'static str> {
        match self {
            Self::User => user::params(),
            Self::Schema => schema::params(),
            Self::Role => role::params(),
            Self::Profile => profile::params(),
            Self::Tablespace => tablespace::params(),
            Self::Privilege => privilege::params(),
            Self::Job => job::params(),
            Self::Param => param::params(),
            Self::Startup => startup::params(),
            Self::Shutdown => shutdown::params(),
            Self::Backup => backup::params(),
            Self::Restore => restore::params(),
            Self::Instances => instances::params(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result record of one module run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Commands that would run, reported in check mode
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub action: Option<Action>,
}

impl ModuleResult {
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            ..Default::default()
        }
    }

    /// Failed result classified by the first [`orakit::Error`] in the chain
    pub fn failure(error: &anyhow::Error) -> Self {
        let oracle = error
            .chain()
            .find_map(|e| e.downcast_ref::<orakit::Error>());
        let category = oracle
            .map(orakit::Error::category)
            .unwrap_or(ErrorCategory::Environment);

        let mut result = Self {
            failed: true,
            msg: format!("{:#}", error),
            error: Some(category.as_str().to_string()),
            ..Default::default()
        };
        if let Some(output) = oracle.and_then(orakit::Error::output) {
            result = result.with_extra("output", output.trim());
        }
        result
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// Outcome category for summaries
    pub fn apply_result(&self) -> ApplyResult {
        if self.failed {
            return ApplyResult::Failed {
                error: self.msg.clone(),
            };
        }
        match &self.action {
            Some(action) => ApplyResult::from(action),
            None if self.changed => ApplyResult::Modified,
            None => ApplyResult::NoChange,
        }
    }
}

impl From<Reconciliation> for ModuleResult {
    fn from(rec: Reconciliation) -> Self {
        Self {
            changed: rec.changed,
            msg: rec.msg,
            commands: rec.commands,
            action: rec.action,
            ..Default::default()
        }
    }
}

/// Everything a module needs besides its arguments
#[derive(Clone)]
pub struct ModuleContext {
    pub settings: Settings,
    backend: Arc<dyn Backend>,
    pub check_mode: bool,
    pub verbose: bool,
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("settings", &self.settings)
            .field("check_mode", &self.check_mode)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl ModuleContext {
    pub fn new(settings: Settings, backend: Arc<dyn Backend>) -> Self {
        Self {
            settings,
            backend,
            check_mode: false,
            verbose: false,
        }
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn apply_context(&self) -> ApplyContext {
        ApplyContext::new(self.check_mode, self.verbose)
    }

    /// Client for `target`, after checking the elevation account
    pub fn client(&self, target: ConnectTarget, env: OracleEnv) -> Result<Client> {
        self.settings.elevation.verify()?;
        Ok(Client::new(self.backend.clone(), target, env))
    }

    /// SIDs with a running pmon on this host
    pub fn running_instances(&self) -> orakit::Result<Vec<String>> {
        self.backend.running_instances()
    }
}

/// Run a module, folding any error into a failed result
pub fn run(kind: ModuleKind, args: &ModuleArgs, ctx: &ModuleContext) -> ModuleResult {
    let ctx = ctx.clone().with_check_mode(ctx.check_mode || args.check_mode());
    log::debug!("Running {} module (check_mode={})", kind, ctx.check_mode);

    match dispatch(kind, args, &ctx) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("{} module failed: {:#}", kind, e);
            ModuleResult::failure(&e)
        }
    }
}

fn dispatch(kind: ModuleKind, args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    args.ensure_known(kind.name(), &kind.params())?;

    match kind {
        ModuleKind::User => user::run(args, ctx),
        ModuleKind::Schema => schema::run(args, ctx),
        ModuleKind::Role => role::run(args, ctx),
        ModuleKind::Profile => profile::run(args, ctx),
        ModuleKind::Tablespace => tablespace::run(args, ctx),
        ModuleKind::Privilege => privilege::run(args, ctx),
        ModuleKind::Job => job::run(args, ctx),
        ModuleKind::Param => param::run(args, ctx),
        ModuleKind::Startup => startup::run(args, ctx),
        ModuleKind::Shutdown => shutdown::run(args, ctx),
        ModuleKind::Backup => backup::run(args, ctx),
        ModuleKind::Restore => restore::run(args, ctx),
        ModuleKind::Instances => instances::run(args, ctx),
    }
}

/// Reconcile a resource with the context's check mode
pub fn reconcile(resource: &dyn Resource, ctx: &ModuleContext) -> Result<ModuleResult> {
    let mut apply = ctx.apply_context();
    let rec = declarative::reconcile(resource, &mut apply)?;
    Ok(ModuleResult::from(rec))
}

/// Wrap synthesized statements into one SQL*Plus script
///
/// Statements opening with `BEGIN` or `DECLARE` are PL/SQL blocks.
pub fn sql_script(commands: &[String]) -> SqlScript {
    commands.iter().fold(SqlScript::new(), |script, command| {
        let head = command.trim_start().to_uppercase();
        if head.starts_with("BEGIN") || head.starts_with("DECLARE") {
            script.plsql(command.clone())
        } else {
            script.sql(command.clone())
        }
    })
}

/// Password that never shows up in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use orakit::backend::scripted::ScriptedBackend;

    /// Context backed by a scripted backend, elevation disabled
    pub fn context(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, ModuleContext) {
        let backend = Arc::new(backend);
        let mut settings = Settings::default();
        settings.elevation.enabled = false;
        settings.connection.sid = Some("ORCL".to_string());
        let ctx = ModuleContext::new(settings, backend.clone());
        (backend, ctx)
    }
}
