//! Connection coordinates shared by the database modules
//!
//! Request values win over `[connection]` settings, which win over the
//! local bequeath default.

use anyhow::Result;
use orakit::{Client, ConnectTarget, ConnectionType, DEFAULT_PORT, OracleEnv};

use super::ModuleContext;
use super::args::ModuleArgs;
use crate::config::Settings;

/// Addressing parameters accepted by every database module
pub const ADDRESS_PARAMS: &[&str] = &["sid", "service_name", "host", "port", "connection_type"];

/// Names of the login parameters
///
/// Modules whose resource has its own `password` take the login as
/// `login_user`/`login_password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Login {
    Plain,
    Prefixed,
}

impl Login {
    pub fn keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Plain => ("user", "password"),
            Self::Prefixed => ("login_user", "login_password"),
        }
    }
}

/// All connection parameter names for a module, followed by its own
pub fn params(login: Login, own: &[&'static str]) -> Vec<&'static str> {
    let (user, password) = login.keys();
    let mut all: Vec<&'static str> = own.to_vec();
    all.extend_from_slice(ADDRESS_PARAMS);
    all.push(user);
    all.push(password);
    all
}

/// Resolve the connection target for a request
pub fn target(args: &ModuleArgs, settings: &Settings, login: Login) -> orakit::Result<ConnectTarget> {
    let defaults = &settings.connection;
    let (user_key, password_key) = login.keys();

    let connection_type = match args
        .str("connection_type")?
        .or_else(|| defaults.connection_type.clone())
    {
        Some(value) => ConnectionType::parse(value.trim()).ok_or_else(|| {
            orakit::Error::validation(format!(
                "connection_type must be one of sysdba, sysoper, sysbackup, sysdg, syskm, normal, got '{}'",
                value
            ))
        })?,
        None => ConnectionType::default(),
    };

    let target = ConnectTarget {
        sid: args.str("sid")?.or_else(|| defaults.sid.clone()),
        service_name: args
            .str("service_name")?
            .or_else(|| defaults.service_name.clone()),
        host: args.str("host")?.or_else(|| defaults.host.clone()),
        port: args.u16("port")?.or(defaults.port).unwrap_or(DEFAULT_PORT),
        user: args.str(user_key)?,
        password: args.str(password_key)?,
        connection_type,
    };
    target.validate()?;
    Ok(target)
}

/// Child environment for `sid`
///
/// `home` and `base` override the `[oracle]` settings.
pub fn env(
    sid: Option<&str>,
    settings: &Settings,
    home: Option<&str>,
    base: Option<&str>,
) -> OracleEnv {
    OracleEnv {
        oracle_sid: sid.map(str::to_string),
        oracle_home: home
            .map(crate::paths::expand)
            .or_else(|| settings.oracle.home_path()),
        oracle_base: base
            .map(crate::paths::expand)
            .or_else(|| settings.oracle.base_path()),
    }
}

/// Client for the database named by the request
pub fn client(args: &ModuleArgs, ctx: &ModuleContext, login: Login) -> Result<Client> {
    let target = target(args, &ctx.settings, login)?;
    let env = env(target.sid.as_deref(), &ctx.settings, None, None);
    ctx.client(target, env)
}

/// Instance-control parameters: a local SID and its software home
pub const LOCAL_PARAMS: &[&str] = &["sid", "oracle_home", "oracle_base"];

/// Bequeath client for the local instance named by `sid` or the settings
///
/// Returns the SID alongside the client.
pub fn local_client(args: &ModuleArgs, ctx: &ModuleContext) -> Result<(String, Client)> {
    let sid = args
        .str("sid")?
        .or_else(|| ctx.settings.connection.sid.clone())
        .ok_or_else(|| orakit::Error::validation("missing required arguments: sid"))?;
    let target = ConnectTarget::local(sid.clone());
    target.validate()?;

    let env = env(
        Some(&sid),
        &ctx.settings,
        args.str("oracle_home")?.as_deref(),
        args.str("oracle_base")?.as_deref(),
    );
    Ok((sid, ctx.client(target, env)?))
}
