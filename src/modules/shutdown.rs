//! Instance shutdown

use anyhow::Result;
use orakit::SqlScript;

use super::args::ModuleArgs;
use super::connection;
use super::{ModuleContext, ModuleResult};

const MODES: &[&str] = &["IMMEDIATE", "NORMAL", "TRANSACTIONAL", "ABORT"];

/// Database not open / not mounted: the instance still goes down
const TOLERATED: &[&str] = &["ORA-01109", "ORA-01507"];

pub fn params() -> Vec<&'static str> {
    let mut params = vec!["mode", "force"];
    params.extend_from_slice(connection::LOCAL_PARAMS);
    params
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let mode = if args.flag("force", false)? {
        "ABORT"
    } else {
        args.choice("mode", MODES, Some("IMMEDIATE"))?
    };
    let (sid, client) = connection::local_client(args, ctx)?;

    if !client.is_running(&sid)? {
        return Ok(ModuleResult::unchanged(format!(
            "Oracle instance {} is not running; no action needed.",
            sid
        )));
    }

    let command = format!("SHUTDOWN {}", mode);
    if ctx.check_mode {
        return Ok(ModuleResult::changed(format!(
            "Oracle instance {} would be shut down with {} mode.",
            sid, mode
        ))
        .with_commands(vec![command]));
    }

    let script = SqlScript::new().command(command).continue_on_error();
    let (_, tolerated) = client.execute_tolerating(&script, TOLERATED)?;
    for code in tolerated {
        log::debug!("{} reported {} during shutdown", sid, code);
    }

    log::info!("Shut down {} with {} mode", sid, mode);
    Ok(ModuleResult::changed(format!(
        "Oracle instance {} shut down successfully with {} mode.",
        sid, mode
    )))
}
