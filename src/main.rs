mod r#become;
mod cli;
mod commands;
mod config;
mod engine;
mod modules;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use orakit::backend::cli::CliBackend;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use config::Settings;
use modules::ModuleContext;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

impl Context {
    /// Load settings and wire the real CLI backend
    pub fn module_context(&self) -> Result<ModuleContext> {
        let settings = Settings::load(self.config.as_deref())?;
        let backend = Arc::new(CliBackend::new(settings.elevation.launcher()));
        Ok(ModuleContext::new(settings, backend).with_verbose(self.verbose > 0))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Command::Run(args) => commands::run::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Modules => {
            commands::catalog::run(&ctx);
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "oractl", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
