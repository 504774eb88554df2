//! Plan execution with terminal UI integration
//!
//! Every task is previewed in check mode first. A failed preview blocks the
//! plan unless an earlier task changes something, since the later task may
//! depend on it. Tasks then run one after another; the first failure stops
//! the plan and the remaining tasks are reported as skipped.

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ExecuteSummary, ProgressCallback};

use crate::modules::{self, ModuleContext};

use super::differ::{Preview, display_preview};
use super::planner::ExecutionPlan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Preview only
    pub check: bool,
    /// Skip confirmation prompts
    pub yes: bool,
}

/// Preview, confirm and run a plan
pub fn execute(
    plan: &ExecutionPlan,
    ctx: &ModuleContext,
    opts: &ExecuteOptions,
    progress: &mut dyn ProgressCallback,
    confirm: &mut dyn ConfirmCallback,
) -> Result<ExecuteSummary> {
    // 1. Preview every task
    let preview_ctx = ctx.clone().with_check_mode(true);
    let previews: Vec<Preview> = plan
        .tasks
        .iter()
        .map(|task| Preview {
            name: task.name.clone(),
            kind: task.kind,
            result: modules::run(task.kind, &task.args, &preview_ctx),
        })
        .collect();
    display_preview(&previews);

    let mut summary = ExecuteSummary::default();

    let first_change = previews.iter().position(|p| p.result.changed);
    let blocked = previews
        .iter()
        .enumerate()
        .any(|(i, p)| p.result.failed && first_change.is_none_or(|c| c > i));
    if blocked {
        println!();
        println!("  {} Plan has failing tasks - nothing applied", "✗".red());
        for preview in &previews {
            summary.add_result(&preview.result.apply_result());
        }
        return Ok(summary);
    }

    if !previews.iter().any(|p| p.result.changed) {
        println!();
        println!("  {} No changes needed", "✓".green());
        summary.no_change = previews.len();
        return Ok(summary);
    }

    if opts.check {
        println!();
        println!("  {} Check mode - no changes made", "ℹ".blue());
        for preview in &previews {
            if preview.result.failed {
                summary.add_result(&ApplyResult::Skipped {
                    reason: "depends on earlier changes".to_string(),
                });
            } else {
                summary.add_result(&preview.result.apply_result());
            }
        }
        return Ok(summary);
    }

    // 2. Confirm (unless --yes)
    if !opts.yes && !confirm.confirm("Apply these changes?")? {
        println!();
        println!("  {} Aborted", "✗".red());
        summary.skipped = previews.len();
        return Ok(summary);
    }

    // 3. Run sequentially, stopping at the first failure
    progress.on_batch_start(plan.tasks.len());
    let mut failed = false;
    for task in &plan.tasks {
        if failed {
            let skipped = ApplyResult::Skipped {
                reason: "an earlier task failed".to_string(),
            };
            progress.on_resource_complete(&task.name, &skipped, "skipped");
            summary.add_result(&skipped);
            continue;
        }

        progress.on_resource_start(&task.name, task.kind.description());
        let result = modules::run(task.kind, &task.args, ctx);
        let outcome = result.apply_result();
        progress.on_resource_complete(&task.name, &outcome, &result.msg);
        summary.add_result(&outcome);
        failed = result.failed;
    }
    progress.on_batch_complete();

    // 4. Summary
    print_summary(&summary);
    Ok(summary)
}

/// Prints one line per finished task
pub struct TerminalProgress {
    pub quiet: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_batch_start(&mut self, count: usize) {
        if !self.quiet {
            println!();
            println!("  {} Running {} tasks...", "→".cyan(), count);
        }
    }

    fn on_resource_start(&mut self, id: &str, description: &str) {
        log::debug!("Starting {} ({})", id, description);
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult, msg: &str) {
        let symbol = match result {
            ApplyResult::NoChange => "○".dimmed(),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
            ApplyResult::Failed { .. } => "✗".red(),
            ApplyResult::Skipped { .. } => "⊘".yellow(),
        };
        if self.quiet && result.is_success() {
            return;
        }
        println!("    {} {}: {}", symbol, id, msg);
    }

    fn on_batch_complete(&mut self) {}
}

/// Asks on the terminal
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Plan applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Plan stopped on an error", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} already in the desired state", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} tasks skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "tasks".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing;
    use declarative::{AutoConfirm, AutoDecline, NoProgress};
    use orakit::backend::scripted::ScriptedBackend;

    const PLAN: &str = r#"
[[task]]
name = "data"
module = "tablespace"
args = { tablespace = "data", size = "10M" }

[[task]]
name = "app user"
module = "user"
args = { username = "app", password = "AppPass1" }

[[task]]
name = "grants"
module = "privilege"
args = { grantee = "app", privileges = "create session" }
"#;

    fn plan() -> ExecutionPlan {
        ExecutionPlan::parse(PLAN).unwrap()
    }

    #[test]
    fn test_runs_all_tasks_in_order() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let summary = execute(
            &plan(),
            &ctx,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 3);
        assert!(summary.is_success());
        let scripts: Vec<String> = backend.calls().into_iter().map(|c| c.script).collect();
        let tablespace = scripts.iter().position(|s| s.contains("CREATE TABLESPACE")).unwrap();
        let user = scripts.iter().position(|s| s.contains("CREATE USER")).unwrap();
        let grant = scripts
            .iter()
            .position(|s| s.contains("GRANT CREATE SESSION TO APP"))
            .unwrap();
        assert!(tablespace < user && user < grant);
    }

    #[test]
    fn test_check_mode_changes_nothing() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let opts = ExecuteOptions {
            check: true,
            yes: false,
        };
        let summary = execute(&plan(), &ctx, &opts, &mut NoProgress, &mut AutoDecline).unwrap();

        assert_eq!(summary.created, 3);
        assert!(backend.scripts_containing("CREATE TABLESPACE").is_empty());
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let summary = execute(
            &plan(),
            &ctx,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 3);
        assert!(backend.scripts_containing("CREATE").is_empty());
    }

    #[test]
    fn test_first_failure_stops_the_plan() {
        let (backend, ctx) = testing::context(
            ScriptedBackend::new().fail("CREATE USER", "ORA-01920: user name 'APP' conflicts"),
        );
        let opts = ExecuteOptions {
            check: false,
            yes: true,
        };
        let summary = execute(&plan(), &ctx, &opts, &mut NoProgress, &mut AutoDecline).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(backend.scripts_containing("GRANT CREATE SESSION TO APP").is_empty());
    }

    #[test]
    fn test_converged_plan_needs_no_confirmation() {
        let (backend, ctx) = testing::context(
            ScriptedBackend::new()
                .respond("FROM dba_tablespaces", "DATA\n")
                .respond("FROM dba_users", "OPEN\n")
                .respond("dba_sys_privs", "CREATE SESSION|NO\n"),
        );
        let summary = execute(
            &plan(),
            &ctx,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.no_change, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(backend.calls().len(), 3);
    }

    #[test]
    fn test_task_depending_on_earlier_change_is_deferred() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("initORCL.ora").display().to_string();
        let plan = ExecutionPlan::parse(&format!(
            "[[task]]\nname = \"create\"\nmodule = \"param\"\n\
             args = {{ action = \"create\", pfile = \"{path}\", parameters = {{ processes = 300 }} }}\n\n\
             [[task]]\nname = \"modify\"\nmodule = \"param\"\n\
             args = {{ action = \"modify\", pfile = \"{path}\", parameters = {{ open_cursors = 500 }} }}\n"
        ))
        .unwrap();
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let opts = ExecuteOptions {
            check: false,
            yes: true,
        };
        let summary = execute(&plan, &ctx, &opts, &mut NoProgress, &mut AutoDecline).unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.created, 1);
        assert_eq!(summary.modified, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "processes = 300\nopen_cursors = 500\n");
    }

    #[test]
    fn test_deferred_task_is_skipped_in_check_mode() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("initORCL.ora").display().to_string();
        let plan = ExecutionPlan::parse(&format!(
            "[[task]]\nmodule = \"param\"\n\
             args = {{ action = \"create\", pfile = \"{path}\", parameters = {{ processes = 300 }} }}\n\n\
             [[task]]\nmodule = \"param\"\n\
             args = {{ action = \"modify\", pfile = \"{path}\", parameters = {{ open_cursors = 500 }} }}\n"
        ))
        .unwrap();
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let opts = ExecuteOptions {
            check: true,
            yes: false,
        };
        let summary = execute(&plan, &ctx, &opts, &mut NoProgress, &mut AutoDecline).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert!(!std::path::Path::new(&path).exists());
    }

    #[test]
    fn test_invalid_task_blocks_the_plan() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let plan = ExecutionPlan::parse(
            "[[task]]\nmodule = \"tablespace\"\nargs = { tablespace = \"t\", maxsize = \"1G\", size = \"1M\" }\n",
        )
        .unwrap();
        let summary = execute(
            &plan,
            &ctx,
            &ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(backend.calls().is_empty());
    }
}
