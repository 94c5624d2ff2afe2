use std::time::Duration;
use thiserror::Error;

/// Why a recording was stopped before segmentation could run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopReason {
    /// The execution exceeded its wall-clock budget.
    #[error("execution timeout after {0:?}")]
    Timeout(Duration),
    /// The execution recorded more steps than allowed.
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
    /// The supervisor aborted execution for some other reason.
    #[error("execution aborted: {0}")]
    Aborted(String),
}

/// Error type for trace segmentation.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Recording was cancelled; no blocks are produced.
    #[error("trace cancelled: {0}")]
    Cancelled(#[from] StopReason),
    /// A block split broke the partition of the trace. Indicates a bug, not bad input.
    #[error("structural violation: {0}")]
    Structural(String),
}

/// Errors raised while turning a segmentation result into its external form.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Segmentation was cancelled, the stop reason replaces the block array.
    #[error("{0}")]
    Stopped(StopReason),
    /// Segmentation failed an internal check.
    #[error("segmentation failed: {0}")]
    Segment(String),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<SegmentError> for AssembleError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::Cancelled(reason) => AssembleError::Stopped(reason),
            SegmentError::Structural(msg) => AssembleError::Segment(msg),
        }
    }
}

/// Error returned when a mnemonic does not name an opcode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown opcode mnemonic: {0}")]
pub struct OpcodeParseError(pub String);

/// Errors while loading a recorded trace or configuration from disk.
#[derive(Debug, Error)]
pub enum TraceInputError {
    /// The input file could not be read.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// Path as given on input.
        path: String,
        /// Underlying io error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON trace, script or configuration.
    #[error("invalid trace json: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex-encoded field did not decode.
    #[error("invalid hex in field '{field}': {source}")]
    Hex {
        /// Name of the offending field.
        field: &'static str,
        /// Underlying decode error.
        #[source]
        source: hex::FromHexError,
    },
}

/// Error type for the transaction log document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File read/write error.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
