//! Command-line interface definitions using clap.

use crate::output::OutputFormat;
use crate::version;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Reset and inspect worker pools of a running process manager.
#[derive(Parser, Debug)]
#[command(name = "poolctl")]
#[command(author, version = version::clap_version(), long_version = version::long_version(), about, long_about = None)]
pub struct Cli {
    /// RPC address of the manager (tcp://host:port or host:port).
    #[arg(long, env = "POOLCTL_RPC_ADDR", global = true)]
    pub rpc_addr: Option<String>,

    /// Manager config file to read `rpc.listen` from (defaults to ./.rr.yaml when present).
    #[arg(short, long, env = "POOLCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Timeout in seconds for connecting and for each RPC call (0 disables).
    #[arg(long, default_value_t = 30, global = true)]
    pub rpc_timeout: u64,

    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, env = "NO_COLOR", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reset workers of all or specific pools.
    Reset(ResetArgs),

    /// Show information about active workers.
    Workers(WorkersArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for the reset command.
#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Pools to reset (all known pools when omitted).
    pub pools: Vec<String>,
}

/// Arguments for the workers command.
#[derive(Parser, Debug)]
pub struct WorkersArgs {
    /// Pools to show (all known pools when omitted).
    pub pools: Vec<String>,

    /// Render an interactive workers table, refreshed every second.
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Table)]
    pub format: OutputFormatArg,

    /// Use ASCII table borders instead of Unicode.
    #[arg(long)]
    pub ascii: bool,
}

/// Arguments for shell completions.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate and print completions to stdout.
    pub fn generate(&self) {
        clap_complete::generate(
            self.shell,
            &mut Cli::command(),
            "poolctl",
            &mut std::io::stdout(),
        );
    }
}

/// Output format argument.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormatArg {
    /// Colored table output.
    #[default]
    Table,
    /// JSON output, one object per pool.
    Json,
    /// Plain tab-separated output (no colors).
    Plain,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Plain => OutputFormat::Plain,
        }
    }
}

/// Verbosity level for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// -q: errors only.
    Quiet,
    /// Default: warnings and results.
    Normal,
    /// -v: include progress info.
    Info,
    /// -vv: include debug info (RPC calls).
    Debug,
}

impl Cli {
    /// Get the verbosity level based on -v and -q flags.
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            return Verbosity::Quiet;
        }
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}
