/// Entry point for the scopetrace CLI.
///
/// This module parses command-line arguments and dispatches to subcommands for segmenting a
/// recorded execution trace into basic blocks, classifying opcodes, or building a transaction
/// log document. It initializes logging and handles the main execution flow.
use clap::Parser;
use scopetrace_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Command-line interface for scopetrace.
///
/// scopetrace reconstructs the basic-block structure of a single transaction from the
/// instruction trace an instrumented EVM recorded while running it.
#[derive(Parser)]
#[command(name = "scopetrace")]
#[command(about = "scopetrace: basic blocks from EVM execution traces")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Runs the scopetrace CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute().await
}
