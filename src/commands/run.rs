//! `oractl run` - one module, one result object

use anyhow::{Context as _, Result};
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use crate::Context;
use crate::cli::{OutputFormat, RunArgs};
use crate::modules::{self, ModuleKind, ModuleResult, args::ModuleArgs};

pub fn run(ctx: &Context, args: RunArgs) -> Result<ExitCode> {
    let result = match prepare(ctx, &args) {
        Ok((module_args, module_ctx)) => modules::run(args.module, &module_args, &module_ctx),
        Err(e) => ModuleResult::failure(&e),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text(args.module, &result),
    }

    Ok(if result.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn prepare(ctx: &Context, args: &RunArgs) -> Result<(ModuleArgs, modules::ModuleContext)> {
    let module_args = load_args(args.args_file.as_deref(), &args.args)?;
    let module_ctx = ctx.module_context()?.with_check_mode(args.check);
    Ok((module_args, module_ctx))
}

/// Arguments from an optional JSON file, overridden by `KEY=VALUE` pairs
fn load_args(file: Option<&Path>, pairs: &[String]) -> Result<ModuleArgs> {
    let base = match file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let value: Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            ModuleArgs::from_json(value)?
        }
        None => ModuleArgs::new(),
    };
    Ok(base.merge(ModuleArgs::from_pairs(pairs)?))
}

fn print_text(kind: ModuleKind, result: &ModuleResult) {
    let status = if result.failed {
        "failed".red().bold()
    } else if result.changed {
        "changed".yellow().bold()
    } else {
        "ok".green().bold()
    };
    println!("{} [{}] {}", status, kind, result.msg);

    if let Some(category) = &result.error {
        println!("  {} {}", "error:".dimmed(), category);
    }
    for command in &result.commands {
        println!("  {}", command.dimmed());
    }
    if let Some(Value::String(diff)) = result.extra.get("diff") {
        print_diff(diff);
    }
    if let Some(Value::Array(databases)) = result.extra.get("databases") {
        for db in databases.iter().filter_map(Value::as_str) {
            println!("  • {}", db);
        }
    }
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("  {}", line.bold());
        } else if line.starts_with('+') {
            println!("  {}", line.green());
        } else if line.starts_with('-') {
            println!("  {}", line.red());
        } else if line.starts_with("@@") {
            println!("  {}", line.cyan());
        } else {
            println!("  {}", line.dimmed());
        }
    }
}
