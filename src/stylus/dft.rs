//! DFT based stylus interpolation.
//!
//! Newer digitizers do not report stylus coordinates. Instead they send
//! bursts of antenna measurements from which the tip position, tilt,
//! pressure and button state have to be reconstructed.

use crate::config::{Config, StylusConfig};
use crate::geometry::{Point, Vector};
use crate::protocol::{
    Antenna, DftKind, DftWindow, StylusSample, ToolMetadata, Transform, BUTTON_BARREL,
    BUTTON_ERASER, MAX_X, MAX_Y,
};

/// Mapping from antenna index space to device coordinates.
///
/// Chosen once when the estimator is created.
#[derive(Debug, Clone, PartialEq)]
pub enum Calibration {
    /// Device metadata: transform into a sensor space of the given size.
    Metadata {
        /// Antenna index to sensor space.
        transform: Transform,
        /// Sensor width in transform units.
        width: f64,
        /// Sensor height in transform units.
        height: f64,
    },
    /// No usable metadata: antenna indices scale linearly over the device range.
    Defaults {
        /// Row antenna count.
        rows: u32,
        /// Column antenna count.
        columns: u32,
    },
}

impl Calibration {
    /// Uses the metadata transform when it describes a sensor with an area.
    pub fn new(metadata: Option<&ToolMetadata>, config: &StylusConfig) -> Self {
        match metadata {
            Some(meta) if meta.width > 0 && meta.height > 0 => Calibration::Metadata {
                transform: meta.transform,
                width: f64::from(meta.width),
                height: f64::from(meta.height),
            },
            Some(meta) if meta.rows > 1 && meta.columns > 1 => Calibration::Defaults {
                rows: meta.rows,
                columns: meta.columns,
            },
            _ => Calibration::Defaults {
                rows: config.default_rows,
                columns: config.default_columns,
            },
        }
    }

    /// Converts an antenna-space position (x = column, y = row) into device
    /// coordinates, clamped to the device range.
    pub fn to_device(&self, antenna: Point) -> Point {
        let (nx, ny) = match *self {
            Calibration::Metadata {
                transform,
                width,
                height,
            } => {
                let p = transform.apply(antenna);
                (p.x / width, p.y / height)
            }
            Calibration::Defaults { rows, columns } => (
                antenna.x / f64::from(columns.max(2) - 1),
                antenna.y / f64::from(rows.max(2) - 1),
            ),
        };

        Point::new(nx.clamp(0.0, 1.0) * MAX_X, ny.clamp(0.0, 1.0) * MAX_Y)
    }
}

/// Result of interpolating one antenna axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisPeak {
    /// Interpolated antenna index within the measured range.
    position: f64,
    /// Strongest antenna, used as phase reference.
    peak: Antenna,
}

/// Phase-aware weighted centroid around the strongest antenna.
///
/// Antennas out of phase with the peak belong to a side lobe and get no
/// weight. Returns `None` if the peak is weaker than `min_amplitude`.
fn interpolate(antennas: &[Antenna], radius: usize, min_amplitude: f64) -> Option<AxisPeak> {
    let (index, peak) = antennas
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &Antenna)>, (i, a)| match best {
            Some((_, b)) if b.amplitude() >= a.amplitude() => best,
            _ => Some((i, a)),
        })?;

    let amplitude = peak.amplitude();
    if !amplitude.is_finite() || amplitude < min_amplitude || amplitude <= 0.0 {
        return None;
    }

    let start = index.saturating_sub(radius);
    let end = (index + radius).min(antennas.len() - 1);

    let mut total = 0.0;
    let mut moment = 0.0;
    for (i, antenna) in antennas.iter().enumerate().take(end + 1).skip(start) {
        let weight = (antenna.coherence(peak) / amplitude).max(0.0);
        total += weight;
        moment += weight * i as f64;
    }

    Some(AxisPeak {
        position: moment / total,
        peak: *peak,
    })
}

/// Reconstructs stylus samples from DFT windows.
#[derive(Debug)]
pub struct DftStylus {
    config: StylusConfig,
    calibration: Calibration,
    /// Physical display size, for tilt.
    display: (f64, f64),
    sample: StylusSample,
    /// Phase reference from the last position window.
    reference: Option<Antenna>,
}

impl DftStylus {
    /// Creates an estimator for one session.
    pub fn new(config: &Config, metadata: Option<&ToolMetadata>) -> Self {
        Self {
            config: config.stylus.clone(),
            calibration: Calibration::new(metadata, &config.stylus),
            display: (config.width, config.height),
            sample: StylusSample::default(),
            reference: None,
        }
    }

    /// The antenna mapping chosen at construction.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// The current stylus state.
    pub fn stylus(&self) -> StylusSample {
        self.sample
    }

    /// Updates the stylus state from a window.
    pub fn input(&mut self, window: &DftWindow) {
        match window.meta.kind {
            DftKind::Position => self.handle_position(window),
            DftKind::Tilt => self.handle_tilt(window),
            DftKind::Pressure => self.handle_pressure(window),
            DftKind::Button => self.handle_button(window),
            DftKind::Unknown(kind) => {
                tracing::debug!(kind, "Ignoring unknown DFT window");
            }
        }
    }

    fn locate(&self, window: &DftWindow) -> Option<(Point, Antenna)> {
        let radius = self.config.window_radius;
        let min = self.config.min_amplitude;

        let x = interpolate(&window.columns, radius, min)?;
        let y = interpolate(&window.rows, radius, min)?;

        let antenna = Point::new(
            f64::from(window.meta.first_column) + x.position,
            f64::from(window.meta.first_row) + y.position,
        );
        Some((self.calibration.to_device(antenna), x.peak))
    }

    fn handle_position(&mut self, window: &DftWindow) {
        let Some((position, reference)) = self.locate(window) else {
            if self.sample.proximity {
                tracing::debug!(energy = window.energy(), "Stylus lost");
            }
            self.lift();
            return;
        };

        self.sample.x = position.x;
        self.sample.y = position.y;
        self.sample.proximity = true;
        self.sample.contact = self.sample.pressure > 0.0;
        self.reference = Some(reference);
    }

    fn handle_tilt(&mut self, window: &DftWindow) {
        if !self.sample.proximity {
            return;
        }
        let Some((secondary, _)) = self.locate(window) else {
            self.sample.tilt_x = 0.0;
            self.sample.tilt_y = 0.0;
            return;
        };

        let (width, height) = self.display;
        let tip = Point::new(self.sample.x, self.sample.y);
        let offset: Vector = secondary - tip;
        let dx = offset.x / MAX_X * width;
        let dy = offset.y / MAX_Y * height;

        let distance = self.config.tilt_distance.max(f64::EPSILON);
        self.sample.tilt_x = dx.atan2(distance).to_degrees();
        self.sample.tilt_y = dy.atan2(distance).to_degrees();
    }

    fn handle_pressure(&mut self, window: &DftWindow) {
        let bins = &window.rows;
        let total: f64 = bins.iter().map(Antenna::amplitude).sum();

        let pressure = if bins.len() < 2 || !total.is_finite() || total < self.config.min_amplitude {
            0.0
        } else {
            let centroid = bins
                .iter()
                .enumerate()
                .map(|(i, a)| i as f64 * a.amplitude())
                .sum::<f64>()
                / total;
            (centroid / (bins.len() - 1) as f64).clamp(0.0, 1.0) * self.config.max_pressure
        };

        self.sample.pressure = pressure;
        self.sample.contact = self.sample.proximity && pressure > 0.0;
    }

    fn handle_button(&mut self, window: &DftWindow) {
        let signal = interpolate(&window.columns, 0, self.config.min_amplitude);

        self.sample.buttons = match (signal, self.reference) {
            (Some(signal), Some(reference)) => {
                if signal.peak.coherence(&reference) >= 0.0 {
                    BUTTON_BARREL
                } else {
                    BUTTON_ERASER
                }
            }
            _ => 0,
        };
    }

    fn lift(&mut self) {
        let serial = self.sample.serial;
        self.sample = StylusSample {
            x: self.sample.x,
            y: self.sample.y,
            ..StylusSample::out_of_range(serial)
        };
        self.reference = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An antenna profile peaking at `center` with the given phase.
    fn profile(len: usize, center: f64, amplitude: f64, phase: f64) -> Vec<Antenna> {
        (0..len)
            .map(|i| {
                let d = i as f64 - center;
                let a = amplitude * (-0.5 * d * d).exp();
                Antenna::new(a * phase.cos(), a * phase.sin())
            })
            .collect()
    }

    fn position_window(x: f64, y: f64) -> DftWindow {
        DftWindow::new(
            DftKind::Position,
            profile(44, y, 1000.0, 0.3),
            profile(64, x, 1000.0, 0.3),
        )
    }

    fn estimator() -> DftStylus {
        DftStylus::new(&Config::default(), None)
    }

    #[test]
    fn test_symmetric_peak_interpolates_exactly() {
        let peak = interpolate(&profile(9, 4.0, 500.0, 1.0), 1, 10.0).unwrap();
        assert!((peak.position - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_peak_moves_centroid() {
        let peak = interpolate(&profile(9, 4.3, 500.0, 0.0), 1, 10.0).unwrap();
        assert!(peak.position > 4.0 && peak.position < 4.5);
    }

    #[test]
    fn test_out_of_phase_neighbor_ignored() {
        let mut antennas = profile(9, 4.0, 500.0, 0.0);
        antennas[5] = Antenna::new(-400.0, 0.0);
        let peak = interpolate(&antennas, 1, 10.0).unwrap();
        assert!(peak.position < 4.0);
    }

    #[test]
    fn test_degenerate_window_reports_no_proximity() {
        let mut dft = estimator();
        dft.input(&position_window(30.0, 20.0));
        assert!(dft.stylus().proximity);

        let empty = DftWindow::new(
            DftKind::Position,
            vec![Antenna::default(); 44],
            vec![Antenna::default(); 64],
        );
        dft.input(&empty);
        assert!(!dft.stylus().proximity);
        assert!(!dft.stylus().contact);
    }

    #[test]
    fn test_fresh_zero_window_is_not_origin() {
        let mut dft = estimator();
        dft.input(&DftWindow::new(
            DftKind::Position,
            vec![Antenna::default(); 44],
            vec![Antenna::default(); 64],
        ));
        assert!(!dft.stylus().proximity);
    }

    #[test]
    fn test_default_calibration_scales_indices() {
        let mut dft = estimator();
        dft.input(&position_window(21.0, 21.0));
        let sample = dft.stylus();

        assert!((sample.x - 21.0 / 63.0 * MAX_X).abs() < 1e-6);
        assert!((sample.y - 21.0 / 43.0 * MAX_Y).abs() < 1e-6);
    }

    #[test]
    fn test_metadata_transform_applied() {
        let metadata = ToolMetadata {
            rows: 44,
            columns: 64,
            width: 200,
            height: 100,
            transform: Transform::from_coefficients([2.0, 0.0, 0.0, 0.0, 2.0, 0.0]),
            vendor: vec![],
        };
        let mut dft = DftStylus::new(&Config::default(), Some(&metadata));
        assert!(matches!(dft.calibration(), Calibration::Metadata { .. }));

        dft.input(&position_window(25.0, 10.0));
        let sample = dft.stylus();
        assert!((sample.x - 0.25 * MAX_X).abs() < 1.0);
        assert!((sample.y - 0.2 * MAX_Y).abs() < 1.0);
    }

    #[test]
    fn test_pressure_sets_contact() {
        let mut dft = estimator();
        dft.input(&position_window(30.0, 20.0));

        let bins = profile(8, 7.0, 300.0, 0.0);
        dft.input(&DftWindow::new(DftKind::Pressure, bins, vec![]));

        let sample = dft.stylus();
        assert!(sample.contact);
        assert!(sample.pressure > 0.5 * 4096.0);
    }

    #[test]
    fn test_button_phase_selects_eraser() {
        let mut dft = estimator();
        dft.input(&position_window(30.0, 20.0));

        let anti = profile(64, 30.0, 1000.0, 0.3 + std::f64::consts::PI);
        dft.input(&DftWindow::new(DftKind::Button, vec![], anti));
        assert!(dft.stylus().eraser());

        let same = profile(64, 30.0, 1000.0, 0.3);
        dft.input(&DftWindow::new(DftKind::Button, vec![], same));
        assert!(dft.stylus().barrel());
    }

    #[test]
    fn test_tilt_from_secondary_electrode() {
        let config = Config::with_display(63.0, 43.0);
        let mut dft = DftStylus::new(&config, None);
        dft.input(&position_window(30.0, 20.0));

        // One column over is 1mm on this display; tilt distance is 6mm.
        let mut tilt = position_window(31.0, 20.0);
        tilt.meta.kind = DftKind::Tilt;
        dft.input(&tilt);

        let sample = dft.stylus();
        assert!((sample.tilt_x - (1.0f64).atan2(6.0).to_degrees()).abs() < 0.5);
        assert!(sample.tilt_y.abs() < 1e-6);
    }
}
