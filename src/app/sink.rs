//! Output boundary of the processor.

use crate::contacts::Contact;
use crate::protocol::StylusEvent;

/// Receives the processed contact and stylus streams.
///
/// Implementations must not call back into the processor.
pub trait EventSink {
    /// Called once before the first event is processed.
    fn on_start(&mut self) {}

    /// Called with the final contact set of each heatmap frame.
    fn on_contacts(&mut self, contacts: &[Contact]);

    /// Called for each stylus update, in physical units.
    fn on_stylus(&mut self, stylus: &StylusEvent);

    /// Called once after the last event has been processed.
    fn on_stop(&mut self) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_start(&mut self) {
        tracing::info!("Processing started");
    }

    fn on_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            tracing::debug!(
                id = contact.id,
                x = contact.mean.x,
                y = contact.mean.y,
                major = contact.size_major,
                minor = contact.size_minor,
                orientation = contact.orientation,
                stable = contact.stable,
                valid = contact.valid.is_valid(),
                "Contact"
            );
        }
    }

    fn on_stylus(&mut self, stylus: &StylusEvent) {
        tracing::debug!(
            serial = stylus.serial,
            x = stylus.position.x,
            y = stylus.position.y,
            pressure = stylus.pressure,
            proximity = stylus.proximity,
            contact = stylus.contact,
            "Stylus"
        );
    }

    fn on_stop(&mut self) {
        tracing::info!("Processing stopped");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Contact sets, one per heatmap frame.
    pub frames: Vec<Vec<Contact>>,
    /// Stylus events in arrival order.
    pub styli: Vec<StylusEvent>,
    /// Set by `on_start`.
    pub started: bool,
    /// Set by `on_stop`.
    pub stopped: bool,
}

impl RecordingSink {
    /// Creates an empty recording.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn on_start(&mut self) {
        self.started = true;
    }

    fn on_contacts(&mut self, contacts: &[Contact]) {
        self.frames.push(contacts.to_vec());
    }

    fn on_stylus(&mut self, stylus: &StylusEvent) {
        self.styli.push(*stylus);
    }

    fn on_stop(&mut self) {
        self.stopped = true;
    }
}
