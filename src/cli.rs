use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::modules::ModuleKind;

#[derive(Parser)]
#[command(name = "oractl")]
#[command(version)]
#[command(about = "Idempotent Oracle database administration modules", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(long, global = true, env = "ORACTL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one module and print its result
    Run(RunArgs),

    /// Run every task of a plan file in order
    Apply(ApplyArgs),

    /// List the available modules and their parameters
    Modules,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Run
// ============================================================================

#[derive(Parser)]
pub struct RunArgs {
    /// Module to run
    #[arg(value_enum)]
    pub module: ModuleKind,

    /// Module argument as KEY=VALUE (repeatable); VALUE is parsed as JSON when possible
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// JSON file with module arguments; --arg values override it
    #[arg(long, value_name = "FILE")]
    pub args_file: Option<PathBuf>,

    /// Probe and report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Parser)]
pub struct ApplyArgs {
    /// Plan file (TOML, one [[task]] per module run)
    pub plan: PathBuf,

    /// Show what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
