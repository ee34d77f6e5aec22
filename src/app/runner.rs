//! Read loop connecting an event source to the processor.

use super::processor::{FrameProcessor, ProcessorError};
use super::sink::EventSink;
use crate::config::{Config, RunnerConfig};
use crate::source::{EventSource, SourceError};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The source failed to open.
    #[error("failed to start source: {0}")]
    Source(#[from] SourceError),
    /// The processor could not be created.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    /// Too many consecutive read failures.
    #[error("giving up after {count} consecutive source errors, last: {last}")]
    TooManyErrors {
        /// Failures in a row.
        count: u32,
        /// The most recent failure.
        last: SourceError,
    },
}

/// Drives a source until it is exhausted, stopped, or keeps failing.
pub struct Runner<E> {
    config: Config,
    settings: RunnerConfig,
    source: E,
}

impl<E: EventSource> Runner<E> {
    /// Creates a runner reading from `source`.
    pub fn new(config: Config, settings: RunnerConfig, source: E) -> Self {
        Self {
            config,
            settings,
            source,
        }
    }

    /// Runs to completion and returns the processor for inspection.
    pub fn run<S: EventSink>(
        self,
        sink: S,
        stop: &AtomicBool,
    ) -> Result<FrameProcessor<S>, RunnerError> {
        self.run_with(sink, stop, |_| {})
    }

    /// Like [`Runner::run`], calling `observe` after every processed event.
    pub fn run_with<S, F>(
        mut self,
        sink: S,
        stop: &AtomicBool,
        mut observe: F,
    ) -> Result<FrameProcessor<S>, RunnerError>
    where
        S: EventSink,
        F: FnMut(&FrameProcessor<S>),
    {
        let metadata = self.source.open()?;
        let mut processor = match FrameProcessor::new(self.config, metadata, sink) {
            Ok(processor) => processor,
            Err(e) => {
                self.source.close();
                return Err(e.into());
            }
        };

        processor.sink_mut().on_start();
        let result = Self::pump(&mut self.source, &self.settings, &mut processor, stop, &mut observe);
        processor.sink_mut().on_stop();
        self.source.close();

        result.map(|processed| {
            tracing::info!(processed, stats = ?processor.stats(), "Run finished");
            processor
        })
    }

    fn pump<S, F>(
        source: &mut E,
        settings: &RunnerConfig,
        processor: &mut FrameProcessor<S>,
        stop: &AtomicBool,
        observe: &mut F,
    ) -> Result<u64, RunnerError>
    where
        S: EventSink,
        F: FnMut(&FrameProcessor<S>),
    {
        let mut processed = 0u64;
        let mut errors = 0u32;

        while !stop.load(Ordering::Relaxed) {
            if settings.event_count > 0 && processed >= settings.event_count {
                break;
            }

            match source.next_event() {
                Ok(event) => {
                    errors = 0;
                    processor.process(&event);
                    processed += 1;
                    observe(processor);
                }
                Err(SourceError::Exhausted) => break,
                Err(e) => {
                    errors += 1;
                    tracing::warn!(error = %e, errors, "Failed to read event");
                    if errors >= settings.max_errors {
                        return Err(RunnerError::TooManyErrors {
                            count: errors,
                            last: e,
                        });
                    }
                }
            }
        }

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sink::RecordingSink;
    use crate::protocol::{Event, HeatmapFrame, StylusSample, ToolMetadata};
    use crate::source::{ReplaySource, SyntheticSource};

    /// Fails every read after `ok` successful ones.
    struct Flaky {
        ok: usize,
        open: bool,
    }

    impl EventSource for Flaky {
        fn open(&mut self) -> Result<Option<ToolMetadata>, SourceError> {
            self.open = true;
            Ok(None)
        }

        fn next_event(&mut self) -> Result<Event, SourceError> {
            if self.ok == 0 {
                return Err(SourceError::ReadFailed("bad report".into()));
            }
            self.ok -= 1;
            Ok(Event::Stylus(StylusSample::out_of_range(0).into()))
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    #[test]
    fn test_runs_until_exhausted() {
        let source = ReplaySource::new(vec![
            Event::Heatmap(HeatmapFrame::new(vec![255; 16], 4, 4, 0, 255)),
            Event::Stylus(StylusSample::out_of_range(0).into()),
        ]);
        let runner = Runner::new(Config::default(), RunnerConfig::default(), source);
        let processor = runner.run(RecordingSink::new(), &AtomicBool::new(false)).unwrap();

        assert_eq!(processor.stats().heatmap_frames, 1);
        assert_eq!(processor.stats().stylus_samples, 1);
        assert!(processor.sink().started);
        assert!(processor.sink().stopped);
    }

    #[test]
    fn test_event_count_limits_run() {
        let settings = RunnerConfig {
            event_count: 7,
            ..Default::default()
        };
        let runner = Runner::new(Config::default(), settings, SyntheticSource::new(32, 24));

        let mut seen = 0;
        runner
            .run_with(RecordingSink::new(), &AtomicBool::new(false), |_| seen += 1)
            .unwrap();
        assert_eq!(seen, 7);
    }

    #[test]
    fn test_stop_flag_ends_run() {
        let runner = Runner::new(Config::default(), RunnerConfig::default(), SyntheticSource::new(32, 24));
        let processor = runner.run(RecordingSink::new(), &AtomicBool::new(true)).unwrap();
        assert_eq!(processor.stats().heatmap_frames, 0);
        assert!(processor.sink().stopped);
    }

    #[test]
    fn test_aborts_after_consecutive_errors() {
        let settings = RunnerConfig {
            max_errors: 5,
            ..Default::default()
        };
        let runner = Runner::new(Config::default(), settings, Flaky { ok: 3, open: false });
        let result = runner.run(RecordingSink::new(), &AtomicBool::new(false));

        assert!(matches!(
            result,
            Err(RunnerError::TooManyErrors { count: 5, last: SourceError::ReadFailed(_) })
        ));
    }

    #[test]
    fn test_invalid_config_fails_before_reading() {
        let runner = Runner::new(
            Config::with_display(0.0, 100.0),
            RunnerConfig::default(),
            ReplaySource::new(vec![]),
        );
        let result = runner.run(RecordingSink::new(), &AtomicBool::new(false));
        assert!(matches!(result, Err(RunnerError::Processor(_))));
    }
}
