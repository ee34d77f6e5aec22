//! Touch rejection cone.
//!
//! The cone has its origin at the stylus tip and opens towards the palm of
//! the hand holding the stylus. Touch points inside it are treated as
//! accidental palm input.

use crate::config::ConeConfig;
use crate::geometry::{Point, Vector};
use std::time::{Duration, Instant};

/// Lifecycle of a cone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConeState {
    /// No stylus position has been seen.
    Dead,
    /// Origin known, no recent palm direction.
    Inactive,
    /// Origin and a recent palm direction are known.
    Active,
}

/// Palm rejection sector anchored at the stylus tip.
#[derive(Debug, Clone)]
pub struct Cone {
    /// Cosine of the angular half-width.
    angle_cos: f64,
    distance: f64,
    timeout: Duration,
    half_life: Duration,
    origin: Option<Point>,
    direction: Option<Vector>,
    position_update: Option<Instant>,
    direction_update: Option<Instant>,
}

impl Cone {
    /// Creates a dead cone with the given half-width (degrees) and reach.
    pub fn new(angle: f64, distance: f64) -> Self {
        let defaults = ConeConfig::default();
        Self {
            angle_cos: angle.to_radians().cos(),
            distance,
            timeout: Duration::from_millis(defaults.timeout_ms),
            half_life: Duration::from_millis(defaults.half_life_ms),
            origin: None,
            direction: None,
            position_update: None,
            direction_update: None,
        }
    }

    /// Creates a dead cone from configuration.
    pub fn from_config(config: &ConeConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            half_life: Duration::from_millis(config.half_life_ms.max(1)),
            ..Self::new(config.angle, config.distance)
        }
    }

    /// Whether a stylus position has ever been supplied.
    #[inline]
    pub fn alive(&self) -> bool {
        self.origin.is_some()
    }

    /// Whether the cone has a direction and neither origin nor direction
    /// is older than the timeout at `now`.
    pub fn active(&self, now: Instant) -> bool {
        let fresh = |t: Option<Instant>| {
            t.is_some_and(|t| now.saturating_duration_since(t) <= self.timeout)
        };
        self.direction.is_some() && fresh(self.position_update) && fresh(self.direction_update)
    }

    /// Lifecycle state at `now`.
    pub fn state(&self, now: Instant) -> ConeState {
        if !self.alive() {
            ConeState::Dead
        } else if self.active(now) {
            ConeState::Active
        } else {
            ConeState::Inactive
        }
    }

    /// Last stylus position, if any.
    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    /// Current palm direction, if any.
    pub fn direction(&self) -> Option<Vector> {
        self.direction
    }

    /// Moves the origin to the current stylus position.
    pub fn update_position(&mut self, point: Point, now: Instant) {
        if self.origin.is_none() {
            tracing::debug!(x = point.x, y = point.y, "Rejection cone alive");
        }
        self.origin = Some(point);
        self.position_update = Some(now);
    }

    /// Turns the cone towards a palm at `point`.
    ///
    /// Older directions decay with the configured half-life, so recent palm
    /// positions dominate. Ignored while the cone is dead.
    pub fn update_direction(&mut self, point: Point, now: Instant) {
        let Some(origin) = self.origin else {
            return;
        };
        let Some(towards) = (point - origin).normalized() else {
            return;
        };

        let blended = match (self.direction, self.direction_update) {
            (Some(previous), Some(at)) => {
                let age = now.saturating_duration_since(at).as_secs_f64();
                let weight = 0.5f64.powf(age / self.half_life.as_secs_f64());
                (previous * weight + towards).normalized().unwrap_or(towards)
            }
            _ => {
                tracing::debug!(dx = towards.x, dy = towards.y, "Rejection cone direction set");
                towards
            }
        };

        self.direction = Some(blended);
        self.direction_update = Some(now);
    }

    /// Whether `point` lies inside the rejection sector.
    ///
    /// Never rejects anything before both an origin and a direction exist.
    pub fn check(&self, point: Point) -> bool {
        let (Some(origin), Some(direction)) = (self.origin, self.direction) else {
            return false;
        };

        let offset = point - origin;
        let distance = offset.norm();
        if distance > self.distance {
            return false;
        }

        offset.dot(direction) > self.angle_cos * distance
    }
}
