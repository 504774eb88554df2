//! Instance startup
//!
//! A running pmon means the instance is up; only `mode: force` restarts it.

use anyhow::Result;
use orakit::{SqlScript, quote};

use super::args::ModuleArgs;
use super::connection;
use super::{ModuleContext, ModuleResult};

const MODES: &[&str] = &["normal", "mount", "nomount", "restrict", "force"];

/// ORA-01081: cannot start already-running ORACLE
const ALREADY_RUNNING: &str = "ORA-01081";

pub fn params() -> Vec<&'static str> {
    let mut params = vec!["mode", "pfile"];
    params.extend_from_slice(connection::LOCAL_PARAMS);
    params
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let mode = args.choice("mode", MODES, Some("normal"))?;
    let pfile = args.str("pfile")?.map(|p| crate::paths::expand(&p));
    let command = startup_command(mode, pfile.as_ref().map(|p| p.display().to_string()).as_deref())?;
    let (sid, client) = connection::local_client(args, ctx)?;

    if mode != "force" && client.is_running(&sid)? {
        return Ok(already_running(&sid));
    }

    if ctx.check_mode {
        return Ok(ModuleResult::changed(format!(
            "Oracle database with SID {} would be started in {} mode.",
            sid, mode
        ))
        .with_commands(vec![command]));
    }

    let script = SqlScript::new().command(command).continue_on_error();
    let (_, tolerated) = client.execute_tolerating(&script, &[ALREADY_RUNNING])?;
    if !tolerated.is_empty() {
        return Ok(already_running(&sid));
    }

    log::info!("Started {} in {} mode", sid, mode);
    Ok(ModuleResult::changed(format!(
        "Oracle database with SID {} started in {} mode.",
        sid, mode
    )))
}

fn already_running(sid: &str) -> ModuleResult {
    ModuleResult::unchanged(format!(
        "Oracle database with SID {} is already running.",
        sid
    ))
}

/// `STARTUP [FORCE] [RESTRICT] [PFILE='…'] [MOUNT|NOMOUNT]`
fn startup_command(mode: &str, pfile: Option<&str>) -> orakit::Result<String> {
    let mut command = String::from("STARTUP");
    match mode {
        "force" => command.push_str(" FORCE"),
        "restrict" => command.push_str(" RESTRICT"),
        _ => {}
    }
    if let Some(pfile) = pfile {
        command.push_str(&format!(" PFILE={}", quote::literal(pfile)?));
    }
    match mode {
        "mount" => command.push_str(" MOUNT"),
        "nomount" => command.push_str(" NOMOUNT"),
        _ => {}
    }
    Ok(command)
}
