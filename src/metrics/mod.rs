//! Prometheus metrics exporter for the processing pipeline.
//!
//! # Metrics Exposed
//!
//! ## Input Metrics
//! - `digitizer_heatmap_frames_total` - Heatmap frames received
//! - `digitizer_stylus_samples_total` - Stylus samples processed
//! - `digitizer_dft_windows_total` - DFT windows received
//! - `digitizer_malformed_frames_total` - Heatmap frames repaired or dropped
//! - `digitizer_heatmap_resizes_total` - Normalized heatmap reallocations
//!
//! ## Output Metrics
//! - `digitizer_contacts_total` - Contacts emitted
//! - `digitizer_contacts_rejected_total` - Contacts invalidated by a cone
//! - `digitizer_active_cones` - Cones currently rejecting touches
//!
//! # Example
//!
//! ```no_run
//! use digitizer_core::app::PipelineStats;
//! use digitizer_core::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let stats = PipelineStats::default();
//! registry.update(&MetricsSnapshot::from_stats(&stats));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, PipelineHealth, ServerError};
