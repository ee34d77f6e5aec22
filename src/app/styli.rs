//! Per-stylus state keyed by serial number.

use crate::config::ConeConfig;
use crate::geometry::Point;
use crate::protocol::StylusSample;
use crate::stylus::Cone;
use std::time::Instant;

/// State owned by one physical stylus.
#[derive(Debug, Clone)]
pub struct StylusState {
    /// Reported serial number; 0 until known.
    pub serial: u32,
    /// Rejection cone anchored at this stylus.
    pub cone: Cone,
    /// Last sample reported for this stylus.
    pub last: Option<StylusSample>,
}

/// Table of known styli with one current entry.
///
/// Serial 0 is a placeholder for a stylus whose serial is not known yet;
/// the first real serial reported adopts it.
#[derive(Debug)]
pub struct StylusTable {
    cone: ConeConfig,
    entries: Vec<StylusState>,
    current: usize,
}

impl StylusTable {
    /// Creates a table holding only the placeholder stylus.
    pub fn new(cone: &ConeConfig) -> Self {
        Self {
            cone: cone.clone(),
            entries: vec![StylusState {
                serial: 0,
                cone: Cone::from_config(cone),
                last: None,
            }],
            current: 0,
        }
    }

    /// Makes the stylus with `serial` current, creating it if needed.
    pub fn switch(&mut self, serial: u32) -> &mut StylusState {
        if let Some(index) = self.entries.iter().position(|s| s.serial == serial) {
            self.current = index;
        } else if self.entries[self.current].serial == 0 {
            tracing::debug!(serial, "Stylus serial assigned");
            self.entries[self.current].serial = serial;
        } else {
            tracing::info!(serial, "New stylus");
            self.entries.push(StylusState {
                serial,
                cone: Cone::from_config(&self.cone),
                last: None,
            });
            self.current = self.entries.len() - 1;
        }

        &mut self.entries[self.current]
    }

    /// The stylus that reported last.
    pub fn current(&self) -> &StylusState {
        &self.entries[self.current]
    }

    /// Looks up a stylus by serial.
    pub fn get(&self, serial: u32) -> Option<&StylusState> {
        self.entries.iter().find(|s| s.serial == serial)
    }

    /// Number of known styli.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the placeholder entry is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any stylus has reported a position.
    pub fn any_alive(&self) -> bool {
        self.entries.iter().any(|s| s.cone.alive())
    }

    /// Number of cones able to reject touches at `now`.
    pub fn active_count(&self, now: Instant) -> usize {
        self.entries.iter().filter(|s| s.cone.active(now)).count()
    }

    /// Turns every alive cone towards a palm.
    pub fn update_direction(&mut self, palm: Point, now: Instant) {
        for state in self.entries.iter_mut().filter(|s| s.cone.alive()) {
            state.cone.update_direction(palm, now);
        }
    }

    /// Whether any active cone contains `point`.
    pub fn rejects(&self, point: Point, now: Instant) -> bool {
        self.entries
            .iter()
            .any(|s| s.cone.active(now) && s.cone.check(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_adopts_first_serial() {
        let mut table = StylusTable::new(&ConeConfig::default());
        table.switch(1234);
        assert_eq!(table.len(), 1);
        assert_eq!(table.current().serial, 1234);
    }

    #[test]
    fn test_new_serial_gets_own_cone() {
        let now = Instant::now();
        let mut table = StylusTable::new(&ConeConfig::default());

        table.switch(1).cone.update_position(Point::new(10.0, 10.0), now);
        table.switch(2);
        assert_eq!(table.len(), 2);
        assert!(!table.current().cone.alive());

        table.switch(1);
        assert!(table.current().cone.alive());
        assert!(table.get(2).is_some());
    }

    #[test]
    fn test_rejects_with_any_active_cone() {
        let now = Instant::now();
        let mut table = StylusTable::new(&ConeConfig::default());
        table.switch(1).cone.update_position(Point::new(0.0, 0.0), now);
        table.switch(2).cone.update_position(Point::new(100.0, 0.0), now);

        table.update_direction(Point::new(110.0, 0.0), now);
        assert_eq!(table.active_count(now), 2);

        // Cone 2 points right; cone 1 points at the palm far away.
        assert!(table.rejects(Point::new(120.0, 0.0), now));
        assert!(table.rejects(Point::new(20.0, 0.0), now));
        assert!(!table.rejects(Point::new(100.0, 40.0), now));
    }
}
