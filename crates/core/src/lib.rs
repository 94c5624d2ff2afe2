//! Reconstruction of basic blocks from a VM execution trace.
//!
//! Events recorded by an [`EventRecorder`] (usually through the [`BlockTracer`] hooks) are cut
//! into [`BasicBlock`]s by the [`segmenter`], annotated with call depth and call index, and
//! serialized by the [`assembler`].

pub mod assembler;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod event;
pub mod opcode;
pub mod recorder;
pub mod segmenter;
pub mod tracer;
pub mod txlog;

pub use classifier::{can_halt, kind_of, width_of, OpKind};
pub use event::{Address, ExecutionEvent};
pub use opcode::Opcode;
pub use recorder::{CancelHandle, EventRecorder, RecordedTrace};
pub use segmenter::{segment, segment_trace, AnnotatedInstruction, BasicBlock, BlockId};
pub use tracer::{BlockTracer, StepTracer};
