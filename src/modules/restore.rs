//! RMAN restores, retried on connection and execution failures

use anyhow::Result;
use orakit::{RetryConfig, RmanScript};
use std::time::Duration;

use super::args::ModuleArgs;
use super::backup::{rman_clauses, tablespace_name};
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult};

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Plain,
        &["restore_type", "name", "rman_parameters", "retries", "retry_delay"],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let restore_type = args.choice("restore_type", &["database", "tablespace"], Some("database"))?;
    let subject = match restore_type {
        "database" => "DATABASE".to_string(),
        _ => format!("TABLESPACE {}", tablespace_name(args, "restore_type")?),
    };
    let command = format!("RESTORE {}{}", subject, rman_clauses(args)?);
    let retry = retry_config(args, ctx)?;

    let client = connection::client(args, ctx, Login::Plain)?;
    if ctx.check_mode {
        return Ok(ModuleResult::changed(format!(
            "RMAN restore of type {} would be completed.",
            restore_type
        ))
        .with_commands(vec![client.redact(&command)]));
    }

    client.rman_with_retry(&RmanScript::new().command(command), &retry)?;
    log::info!("RMAN {} restore finished", restore_type);
    Ok(ModuleResult::changed(format!(
        "RMAN restore of type {} has been completed.",
        restore_type
    )))
}

/// `[restore]` settings, overridden by `retries` and `retry_delay`
fn retry_config(args: &ModuleArgs, ctx: &ModuleContext) -> orakit::Result<RetryConfig> {
    let mut retry = ctx.settings.restore.retry_config();
    if let Some(attempts) = args.u32("retries")? {
        if attempts == 0 {
            return Err(orakit::Error::validation("retries must be at least 1"));
        }
        retry.max_attempts = attempts;
    }
    if let Some(delay) = args.u32("retry_delay")? {
        retry.base_delay = Duration::from_secs(u64::from(delay));
    }
    Ok(retry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing;
    use orakit::backend::scripted::ScriptedBackend;

    fn fast() -> ModuleArgs {
        ModuleArgs::new().with("retry_delay", 0)
    }

    #[test]
    fn test_restore_recovers_after_transient_failures() {
        let (backend, ctx) = testing::context(ScriptedBackend::new().fail_times(
            "RESTORE DATABASE",
            "RMAN-03002: failure of restore command",
            2,
        ));
        let result = run(&fast(), &ctx).unwrap();

        assert!(result.changed);
        assert_eq!(result.msg, "RMAN restore of type database has been completed.");
        assert_eq!(backend.calls().len(), 3);
    }

    #[test]
    fn test_restore_gives_up_after_configured_attempts() {
        let (backend, ctx) = testing::context(
            ScriptedBackend::new().fail("RESTORE", "RMAN-06026: some targets not found"),
        );
        let err = run(&fast().with("retries", 2), &ctx).unwrap_err();

        assert!(err.to_string().contains("RMAN-06026"));
        assert_eq!(backend.calls().len(), 2);
    }

    #[test]
    fn test_tablespace_restore() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let args = fast()
            .with("restore_type", "tablespace")
            .with("name", "users")
            .with("rman_parameters", serde_json::json!({"preview": true}));
        run(&args, &ctx).unwrap();
        assert_eq!(
            backend.scripts_containing("RESTORE TABLESPACE USERS PREVIEW;").len(),
            1
        );
    }

    #[test]
    fn test_validation() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        assert!(run(&fast().with("restore_type", "tablespace"), &ctx).is_err());
        assert!(run(&fast().with("restore_type", "archivelog"), &ctx).is_err());
        assert!(run(&fast().with("retries", 0), &ctx).is_err());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_retry_defaults_come_from_settings() {
        let (_, mut ctx) = testing::context(ScriptedBackend::new());
        ctx.settings.restore.attempts = 5;
        let retry = retry_config(&ModuleArgs::new(), &ctx).unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay, Duration::from_secs(10));
    }
}
