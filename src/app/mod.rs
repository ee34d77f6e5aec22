//! Event processing application.
//!
//! [`FrameProcessor`] owns all pipeline state and is fed one event at a time.
//! [`Runner`] wraps it in a read loop over an [`EventSource`](crate::source::EventSource).

mod processor;
mod runner;
mod sink;
mod styli;

pub use processor::{FrameProcessor, PipelineStats, ProcessorError};
pub use runner::{Runner, RunnerError};
pub use sink::{EventSink, LogSink, RecordingSink};
pub use styli::{StylusState, StylusTable};
