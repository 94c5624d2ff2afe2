/// Module for the `segment` subcommand, which turns a recorded trace into basic blocks.
///
/// The trace is a JSON array of `{pc, op, gas, cost, ret?, value?}` objects. It is replayed
/// through an [`EventRecorder`] under the configured step and time limits, segmented, and the
/// assembled block array is written to stdout or a file.
use async_trait::async_trait;
use clap::Args;
use scopetrace_core::assembler;
use scopetrace_core::config::TraceConfig;
use scopetrace_core::segmenter::SegmentSummary;
use scopetrace_core::{segment_trace, EventRecorder, ExecutionEvent};
use scopetrace_utils::errors::{StopReason, TraceInputError};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the `segment` subcommand.
#[derive(Args)]
pub struct SegmentArgs {
    /// Trace as inline JSON or a file path prefixed with @
    pub input: String,
    /// JSON configuration file (defaults to the development preset)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Cancel after this many recorded steps
    #[arg(long)]
    max_steps: Option<usize>,
    /// Cancel when replay takes longer than this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
    /// Print block/instruction counts instead of the blocks
    #[arg(long)]
    summary: bool,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,
}

/// Parses a JSON trace.
pub fn parse_trace(json: &str) -> Result<Vec<ExecutionEvent>, TraceInputError> {
    Ok(serde_json::from_str(json)?)
}

impl SegmentArgs {
    fn load_config(&self) -> Result<TraceConfig, TraceInputError> {
        let mut config = match &self.config {
            Some(path) => TraceConfig::from_file(path)?,
            None => TraceConfig::development(),
        };
        if self.max_steps.is_some() {
            config.max_steps = self.max_steps;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

#[async_trait]
impl super::Command for SegmentArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let config = self.load_config()?;
        let events = parse_trace(&super::read_input(&self.input)?)?;
        tracing::debug!("loaded {} events", events.len());

        let mut recorder = EventRecorder::with_config(&config);
        recorder.start();

        let watchdog = config.timeout.map(|timeout| {
            let handle = recorder.cancel_handle();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                handle.cancel(StopReason::Timeout(timeout));
            })
        });

        for event in events {
            recorder.record(event);
        }
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let result = segment_trace(recorder.finish());
        if self.summary {
            let summary = SegmentSummary::of(&result?);
            println!("{}", serde_json::to_string(&summary)?);
            return Ok(());
        }

        let json = if self.pretty {
            assembler::to_json_pretty(result)?
        } else {
            assembler::to_json_string(result)?
        };
        match self.output {
            Some(path) => fs::write(path, &json)?,
            None => println!("{json}"),
        }
        Ok(())
    }
}
