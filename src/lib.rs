//! Digitizer Processing Core
//!
//! Turns decoded capacitive touch heatmaps and stylus reports into tracked
//! touch contacts and stylus samples, and rejects touches caused by the palm
//! of the hand holding a stylus.
//!
//! # Architecture
//!
//! ```text
//! source → protocol event → app::FrameProcessor → sink
//!                               ↓          ↓
//!                           contacts    stylus (DFT estimator, cones)
//! ```
//!
//! # Design Principles
//!
//! - **Run to completion**: every event is processed synchronously before the next
//! - **Fail at construction**: configuration errors stop the session, noisy frames never do
//! - **Normalized touch space**: contacts are reported in `[0, 1]` grid coordinates
//!
//! # Example
//!
//! ```no_run
//! use digitizer_core::{
//!     app::{FrameProcessor, RecordingSink},
//!     config::Config,
//!     protocol::{Event, HeatmapFrame},
//! };
//!
//! let config = Config::with_display(260.0, 173.0);
//! let mut processor = FrameProcessor::new(config, None, RecordingSink::new()).unwrap();
//!
//! let frame = HeatmapFrame::new(vec![255; 64 * 44], 64, 44, 0, 255);
//! processor.process(&Event::Heatmap(frame));
//!
//! for contact in processor.contacts() {
//!     println!("{} at {:?}", contact.id, contact.mean);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod app;
pub mod calibrate;
pub mod config;
pub mod contacts;
pub mod geometry;
pub mod metrics;
pub mod protocol;
pub mod source;
pub mod stylus;

// Re-export commonly used types at crate root
pub use app::{EventSink, FrameProcessor, ProcessorError, Runner};
pub use config::{Config, ConfigError, FileConfig};
pub use contacts::{Contact, Validity};
pub use protocol::{Event, HeatmapFrame, StylusEvent, StylusReport, StylusSample};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
