//! `oractl apply` - run a plan file

use anyhow::Result;
use std::process::ExitCode;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions, ExecutionPlan, PromptConfirm, TerminalProgress};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<ExitCode> {
    let plan = ExecutionPlan::load(&args.plan)?;
    let module_ctx = ctx.module_context()?;

    if !ctx.quiet {
        ui::header(&format!("Plan {}", args.plan.display()));
        ui::dim(&format!("{} tasks", plan.tasks.len()));
    }

    let opts = ExecuteOptions {
        check: args.check,
        yes: args.yes,
    };
    let summary = engine::execute(
        &plan,
        &module_ctx,
        &opts,
        &mut TerminalProgress { quiet: ctx.quiet },
        &mut PromptConfirm,
    )?;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
