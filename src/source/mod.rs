//! Event sources feeding the processor.
//!
//! Report decoding lives outside this crate. Sources hand over events that
//! are already typed; the trait lets the runner work with hardware, recorded
//! sessions and synthetic input alike.

mod replay;
mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::SyntheticSource;

use crate::protocol::{Event, ToolMetadata};
use thiserror::Error;

/// Errors that can occur while reading events.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Read before `open`.
    #[error("event source not open")]
    NotOpen,
    /// The device could not be opened.
    #[error("failed to open event source: {0}")]
    OpenFailed(String),
    /// A report could not be read or decoded.
    #[error("failed to read event: {0}")]
    ReadFailed(String),
    /// No more events will arrive.
    #[error("event source exhausted")]
    Exhausted,
}

/// A stream of decoded device events.
pub trait EventSource {
    /// Opens the source and returns the tool metadata, if the device has any.
    fn open(&mut self) -> Result<Option<ToolMetadata>, SourceError>;

    /// Reads the next event.
    ///
    /// Returns [`SourceError::Exhausted`] once no more events will arrive.
    fn next_event(&mut self) -> Result<Event, SourceError>;

    /// Whether `open` succeeded and `close` was not called since.
    fn is_open(&self) -> bool;

    /// Closes the source and releases resources.
    fn close(&mut self);
}
