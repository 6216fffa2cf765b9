use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::estimator::Spectrum;
use super::fitter::PowerLawModel;
use crate::error::{InversionError, Result};

// ---------------------------------------------------------------------------
// TaperWindow – half-Hanning band-pass envelope
// ---------------------------------------------------------------------------

/// Band-pass envelope in Hz: 0 below `lo_start`, half-cosine ramp up to
/// `lo_end`, flat 1 up to `hi_start`, half-cosine ramp down to `hi_end`, 0
/// above.
///
/// `lo_end == hi_start` is accepted and degenerates to ramp-up-then-down with
/// no flat passband.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaperWindow {
    pub lo_start: f64,
    pub lo_end: f64,
    pub hi_start: f64,
    pub hi_end: f64,
}

impl Default for TaperWindow {
    fn default() -> Self {
        Self {
            lo_start: 5.0,
            lo_end: 10.0,
            hi_start: 60.0,
            hi_end: 80.0,
        }
    }
}

impl TaperWindow {
    pub fn new(lo_start: f64, lo_end: f64, hi_start: f64, hi_end: f64) -> Result<Self> {
        let window = TaperWindow { lo_start, lo_end, hi_start, hi_end };
        window.validate()?;
        Ok(window)
    }

    /// Ordering `0 <= lo_start < lo_end <= hi_start < hi_end`.
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.lo_start, self.lo_end, self.hi_start, self.hi_end];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(InversionError::config(format!("taper bounds must be finite: {bounds:?}")));
        }
        let ordered = 0.0 <= self.lo_start
            && self.lo_start < self.lo_end
            && self.lo_end <= self.hi_start
            && self.hi_start < self.hi_end;
        if !ordered {
            return Err(InversionError::config(format!(
                "taper bounds must satisfy 0 <= lo_start < lo_end <= hi_start < hi_end, got {bounds:?}"
            )));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus `hi_end <= nyquist`.
    pub fn validate_for(&self, nyquist: f64) -> Result<()> {
        self.validate()?;
        if self.hi_end > nyquist {
            return Err(InversionError::config(format!(
                "taper upper bound {} Hz exceeds the Nyquist frequency {nyquist} Hz",
                self.hi_end
            )));
        }
        Ok(())
    }

    /// Envelope weight at `frequency`.
    pub fn weight(&self, frequency: f64) -> f64 {
        if frequency < self.lo_start {
            0.0
        } else if frequency < self.lo_end {
            let x = (frequency - self.lo_start) / (self.lo_end - self.lo_start);
            0.5 - 0.5 * (PI * x).cos()
        } else if frequency <= self.hi_start {
            1.0
        } else if frequency < self.hi_end {
            let x = (frequency - self.hi_start) / (self.hi_end - self.hi_start);
            0.5 + 0.5 * (PI * x).cos()
        } else {
            0.0
        }
    }

    pub fn weights(&self, frequencies: &[f64]) -> Vec<f64> {
        frequencies.iter().map(|&f| self.weight(f)).collect()
    }

    /// The flat part `[lo_end, hi_start]`.
    pub fn passband(&self) -> (f64, f64) {
        (self.lo_end, self.hi_start)
    }
}

// ---------------------------------------------------------------------------
// Shaping
// ---------------------------------------------------------------------------

/// Evaluate `model` on the axis of `axis` and apply the taper.
///
/// The model is evaluated only where the weight is non-zero, so `A·0^b` with
/// `b < 0` never enters the result.
pub fn shape_model(model: &PowerLawModel, axis: &Spectrum, window: &TaperWindow) -> Result<Spectrum> {
    window.validate_for(axis.nyquist())?;
    let magnitudes = axis
        .frequencies()
        .iter()
        .map(|&f| {
            let w = window.weight(f);
            if w == 0.0 {
                0.0
            } else {
                w * model.evaluate(f)
            }
        })
        .collect();
    axis.with_magnitudes(magnitudes)
}

/// Apply the taper to the observed magnitudes of `spectrum`.
pub fn shape_observed(spectrum: &Spectrum, window: &TaperWindow) -> Result<Spectrum> {
    window.validate_for(spectrum.nyquist())?;
    let magnitudes = spectrum
        .frequencies()
        .iter()
        .zip(spectrum.magnitudes())
        .map(|(&f, m)| window.weight(f) * m)
        .collect();
    spectrum.with_magnitudes(magnitudes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::estimator::estimate_values;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_on_250_hz_nyquist_axis() {
        let window = TaperWindow::new(0.0, 5.0, 100.0, 120.0).unwrap();
        window.validate_for(250.0).unwrap();
        assert_eq!(window.weight(0.0), 0.0);
        assert_eq!(window.weight(50.0), 1.0);
        assert_eq!(window.weight(120.0), 0.0);
        assert_eq!(window.weight(125.0), 0.0);
        assert_eq!(window.weight(249.0), 0.0);
        assert_abs_diff_eq!(window.weight(2.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(window.weight(110.0), 0.5, epsilon = 1e-12);

        let axis = Spectrum::frequency_axis(500, 0.002);
        let weights = window.weights(&axis);
        for (f, w) in axis.iter().zip(&weights) {
            assert!((0.0..=1.0).contains(w));
            if *f >= 125.0 {
                assert_eq!(*w, 0.0);
            }
        }
    }

    #[test]
    fn degenerate_passband_has_no_nan() {
        let window = TaperWindow::new(10.0, 40.0, 40.0, 70.0).unwrap();
        let axis: Vec<f64> = (0..200).map(|k| k as f64 * 0.5).collect();
        let weights = window.weights(&axis);
        assert!(weights.iter().all(|w| w.is_finite()));
        assert_eq!(window.weight(40.0), 1.0);
        assert!(window.weight(39.5) < 1.0 && window.weight(40.5) < 1.0);
        let peak = weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(peak, 1.0);
    }

    #[test]
    fn ordering_violations_are_configuration_errors() {
        for (a, b, c, d) in [
            (10.0, 5.0, 60.0, 80.0),
            (5.0, 10.0, 9.0, 80.0),
            (5.0, 10.0, 60.0, 60.0),
            (-1.0, 10.0, 60.0, 80.0),
            (5.0, f64::NAN, 60.0, 80.0),
        ] {
            assert!(matches!(
                TaperWindow::new(a, b, c, d),
                Err(InversionError::ConfigurationError(_))
            ));
        }
        let window = TaperWindow::new(5.0, 10.0, 60.0, 300.0).unwrap();
        assert!(matches!(window.validate_for(250.0), Err(InversionError::ConfigurationError(_))));
    }

    #[test]
    fn shaped_model_is_finite_at_dc() {
        let axis = estimate_values(&vec![0.0; 200], 0.001).unwrap();
        let model = PowerLawModel { a: 100.0, b: -1.0 };
        let window = TaperWindow::new(0.0, 10.0, 60.0, 80.0).unwrap();
        let shaped = shape_model(&model, &axis, &window).unwrap();
        let magnitudes = shaped.magnitudes();
        assert!(magnitudes.iter().all(|m| m.is_finite()));
        assert_eq!(magnitudes[0], 0.0);
        assert_abs_diff_eq!(magnitudes[4], 100.0 / 20.0, epsilon = 1e-12);
        assert_eq!(magnitudes[20], 0.0);
    }

    #[test]
    fn observed_spectrum_is_tapered() {
        let values: Vec<f64> = (0..100).map(|i| if i == 0 { 100.0 } else { 0.0 }).collect();
        let flat = estimate_values(&values, 0.004).unwrap();
        let window = TaperWindow::new(5.0, 10.0, 40.0, 60.0).unwrap();
        let shaped = shape_observed(&flat, &window).unwrap();
        for (f, m) in shaped.frequencies().iter().zip(shaped.magnitudes()) {
            assert_abs_diff_eq!(m, window.weight(*f), epsilon = 1e-12);
        }
    }
}
