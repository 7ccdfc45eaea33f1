// src/tracking/calibration.rs
use crate::tracking::types::CalibrationPoint;

/// Accuracy reported before any residual has been measured.
pub const BASELINE_CALIBRATION_ACCURACY: f64 = 0.85;

/// Bookkeeping for one calibration bracket (start, points, finish).
///
/// Residuals are normalized gaze errors reported by the engine for each
/// sample. Accuracy is `1 - mean(residual)` clamped to [0, 1]; with no
/// residuals the baseline is reported.
#[derive(Debug, Clone, Default)]
pub struct CalibrationAccumulator {
    active: bool,
    targets: Vec<CalibrationPoint>,
    samples: Vec<CalibrationPoint>,
    residuals: Vec<f64>,
}

impl CalibrationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, targets: Option<Vec<CalibrationPoint>>) {
        self.active = true;
        self.targets = targets.unwrap_or_default();
        self.samples.clear();
        self.residuals.clear();
    }

    pub fn record(&mut self, point: CalibrationPoint, residual: Option<f64>) {
        self.samples.push(point);
        if let Some(r) = residual.filter(|r| r.is_finite()) {
            self.residuals.push(r.abs());
        }
    }

    /// Closes the bracket, keeping the measured residuals.
    pub fn finish(&mut self) {
        self.active = false;
    }

    /// Closes the bracket and discards what this round collected.
    pub fn cancel(&mut self) {
        self.active = false;
        self.samples.clear();
        self.residuals.clear();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn targets(&self) -> &[CalibrationPoint] {
        &self.targets
    }

    pub fn samples(&self) -> &[CalibrationPoint] {
        &self.samples
    }

    pub fn accuracy(&self) -> f64 {
        if self.residuals.is_empty() {
            return BASELINE_CALIBRATION_ACCURACY;
        }
        let mean = self.residuals.iter().sum::<f64>() / self.residuals.len() as f64;
        (1.0 - mean).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_until_residuals_arrive() {
        let mut cal = CalibrationAccumulator::new();
        assert_eq!(cal.accuracy(), BASELINE_CALIBRATION_ACCURACY);

        cal.begin(None);
        cal.record(CalibrationPoint::new(0.5, 0.5), None);
        assert_eq!(cal.accuracy(), BASELINE_CALIBRATION_ACCURACY);
        assert_eq!(cal.samples().len(), 1);
    }

    #[test]
    fn accuracy_is_mean_residual_complement() {
        let mut cal = CalibrationAccumulator::new();
        cal.begin(Some(vec![CalibrationPoint::new(0.1, 0.1), CalibrationPoint::new(0.9, 0.9)]));
        cal.record(CalibrationPoint::new(0.1, 0.1), Some(0.1));
        cal.record(CalibrationPoint::new(0.9, 0.9), Some(0.3));
        cal.finish();

        assert!(!cal.is_active());
        assert!((cal.accuracy() - 0.8).abs() < 1e-9);
        assert_eq!(cal.targets().len(), 2);
    }

    #[test]
    fn accuracy_stays_in_unit_range() {
        let mut cal = CalibrationAccumulator::new();
        cal.begin(None);
        cal.record(CalibrationPoint::new(0.0, 0.0), Some(4.0));
        cal.record(CalibrationPoint::new(0.0, 0.0), Some(f64::NAN));
        assert_eq!(cal.accuracy(), 0.0);

        cal.clear();
        assert_eq!(cal.accuracy(), BASELINE_CALIBRATION_ACCURACY);
    }

    #[test]
    fn cancel_discards_round() {
        let mut cal = CalibrationAccumulator::new();
        cal.begin(None);
        cal.record(CalibrationPoint::new(0.2, 0.4), Some(0.5));
        cal.cancel();

        assert!(!cal.is_active());
        assert!(cal.samples().is_empty());
        assert_eq!(cal.accuracy(), BASELINE_CALIBRATION_ACCURACY);
    }
}
