//! RMAN backups
//!
//! Backups always report a change. `rman_parameters` is rendered in
//! insertion order, one clause per entry: `true` gives the bare keyword,
//! numbers and single words follow it as they are, and anything else is
//! quoted.

use anyhow::Result;
use orakit::{RmanScript, quote};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult};

static BARE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_$#]+$").expect("bare word regex is valid"));

pub fn params() -> Vec<&'static str> {
    connection::params(Login::Plain, &["backup_type", "name", "rman_parameters"])
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let backup_type = args.choice(
        "backup_type",
        &["database", "archivelog", "tablespace"],
        Some("database"),
    )?;
    let subject = match backup_type {
        "database" => "DATABASE".to_string(),
        "archivelog" => "ARCHIVELOG ALL".to_string(),
        _ => format!("TABLESPACE {}", tablespace_name(args, "backup_type")?),
    };
    let command = format!("BACKUP {}{}", subject, rman_clauses(args)?);

    let client = connection::client(args, ctx, Login::Plain)?;
    if ctx.check_mode {
        return Ok(ModuleResult::changed(format!(
            "RMAN backup of type {} would be created.",
            backup_type
        ))
        .with_commands(vec![client.redact(&command)]));
    }

    client.rman(&RmanScript::new().command(command))?;
    log::info!("RMAN {} backup finished", backup_type);
    Ok(ModuleResult::changed(format!(
        "RMAN backup of type {} has been created.",
        backup_type
    )))
}

/// `name`, required when the operation targets a tablespace
pub(super) fn tablespace_name(args: &ModuleArgs, selector: &str) -> orakit::Result<String> {
    match args.str("name")? {
        Some(name) => quote::identifier(&name, "name"),
        None => Err(orakit::Error::validation(format!(
            "name is required when {} is tablespace",
            selector
        ))),
    }
}

/// Render `rman_parameters` as ` KEY value ...`
pub(super) fn rman_clauses(args: &ModuleArgs) -> orakit::Result<String> {
    let mut clauses = String::new();
    for (key, value) in args.map_values("rman_parameters")? {
        let keyword = quote::keywords(&key, "rman_parameters key")?;
        let rendered = match &value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => None,
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if BARE_WORD.is_match(s) => Some(s.clone()),
            Value::String(s) => Some(quote::literal(s)?),
            Value::Array(_) | Value::Object(_) => {
                return Err(orakit::Error::validation(format!(
                    "rman_parameters.{} must be a scalar",
                    key
                )));
            }
        };
        clauses.push(' ');
        clauses.push_str(&keyword);
        if let Some(rendered) = rendered {
            clauses.push(' ');
            clauses.push_str(&rendered);
        }
    }
    Ok(clauses)
}
