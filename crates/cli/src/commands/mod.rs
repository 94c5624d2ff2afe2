//! Subcommands of the scopetrace CLI and the input helpers they share.

use async_trait::async_trait;
use clap::Subcommand;
use scopetrace_utils::errors::TraceInputError;
use std::error::Error;
use std::fs;

pub mod classify;
pub mod segment;
pub mod txlog;

/// Available subcommands.
#[derive(Subcommand)]
pub enum Cmd {
    /// Segment a recorded execution trace into basic blocks
    Segment(segment::SegmentArgs),

    /// Show kind, width and halting behaviour of opcodes
    Classify(classify::ClassifyArgs),

    /// Build a transaction log document from a scripted transaction
    Txlog(txlog::TxlogArgs),
}

/// A runnable subcommand.
#[async_trait]
pub trait Command {
    /// Runs the command to completion.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Segment(args) => args.execute().await,
            Cmd::Classify(args) => args.execute().await,
            Cmd::Txlog(args) => args.execute().await,
        }
    }
}

/// Reads inline JSON, or the contents of a file when `input` is prefixed with `@`.
pub fn read_input(input: &str) -> Result<String, TraceInputError> {
    match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).map_err(|e| TraceInputError::FileRead {
            path: path.to_string(),
            source: e,
        }),
        None => Ok(input.to_string()),
    }
}
