//! Replays a fixed list of events.

use super::{EventSource, SourceError};
use crate::protocol::{Event, ToolMetadata};
use std::collections::VecDeque;

/// Source that yields a recorded event list once.
#[derive(Debug, Default)]
pub struct ReplaySource {
    events: VecDeque<Event>,
    metadata: Option<ToolMetadata>,
    open: bool,
}

impl ReplaySource {
    /// Creates a closed source over `events`.
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
            metadata: None,
            open: false,
        }
    }

    /// Reports `metadata` when opened.
    pub fn with_metadata(mut self, metadata: ToolMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl EventSource for ReplaySource {
    fn open(&mut self) -> Result<Option<ToolMetadata>, SourceError> {
        self.open = true;
        tracing::debug!(events = self.events.len(), "Replay source opened");
        Ok(self.metadata.clone())
    }

    fn next_event(&mut self) -> Result<Event, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        self.events.pop_front().ok_or(SourceError::Exhausted)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StylusSample;

    #[test]
    fn test_replay_in_order_then_exhausted() {
        let mut source = ReplaySource::new(vec![
            Event::Stylus(StylusSample::out_of_range(1).into()),
            Event::Stylus(StylusSample::out_of_range(2).into()),
        ]);

        assert!(matches!(source.next_event(), Err(SourceError::NotOpen)));
        assert!(source.open().unwrap().is_none());

        let serials: Vec<u32> = (0..2)
            .map(|_| match source.next_event().unwrap() {
                Event::Stylus(report) => report.sample.serial,
                _ => panic!("unexpected event"),
            })
            .collect();
        assert_eq!(serials, vec![1, 2]);
        assert!(matches!(source.next_event(), Err(SourceError::Exhausted)));
    }
}
