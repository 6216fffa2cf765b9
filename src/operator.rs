use rustfft::num_complex::Complex64;

use crate::error::{InversionError, Result};
use crate::spectral::estimator::{inverse_in_place, Spectrum};

// ---------------------------------------------------------------------------
// Operator – the colored-inversion convolution kernel
// ---------------------------------------------------------------------------

/// Real, time-domain convolution kernel centred on sample `len / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    coefficients: Vec<f64>,
    dt: f64,
}

impl Operator {
    /// Wrap precomputed coefficients; the kernel centre is `len / 2`.
    pub fn from_coefficients(coefficients: Vec<f64>, dt: f64) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(InversionError::invalid_input("operator has no coefficients"));
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(InversionError::invalid_input(format!(
                "sampling interval must be positive, got {dt}"
            )));
        }
        Ok(Operator { coefficients, dt })
    }

    /// Unit impulse of length `len` at the centre sample.
    pub fn impulse(len: usize, dt: f64) -> Result<Self> {
        let mut coefficients = vec![0.0; len];
        if let Some(c) = coefficients.get_mut(len / 2) {
            *c = 1.0;
        }
        Self::from_coefficients(coefficients, dt)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Index of time zero.
    pub fn center(&self) -> usize {
        self.coefficients.len() / 2
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Lag of every coefficient in seconds, zero at [`center`](Self::center).
    pub fn lags(&self) -> Vec<f64> {
        let c = self.center() as f64;
        (0..self.len()).map(|i| (i as f64 - c) * self.dt).collect()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the operator from the band-limited well model and the band-limited
/// seismic model.
///
/// The one-sided gap `well − seismic` is expanded to its full
/// conjugate-symmetric spectrum, turned into its analytic spectrum (positive
/// bins doubled, negative bins zeroed), inverse transformed and shifted so
/// that time zero sits at `n / 2`. The imaginary part of that analytic signal
/// is the 90°-rotated kernel. Its amplitude spectrum equals `|gap|` on every
/// bin except DC.
pub fn derive_operator(well: &Spectrum, seismic: &Spectrum) -> Result<Operator> {
    well.ensure_same_axis(seismic)?;

    let gap: Vec<Complex64> = well
        .amplitudes()
        .iter()
        .zip(seismic.amplitudes())
        .map(|(w, s)| w - s)
        .collect();
    let gap = Spectrum::new(gap, well.n_samples(), well.dt())?;

    let n = gap.n_samples();
    let mut analytic = analytic_spectrum(&gap.to_full_spectrum());
    inverse_in_place(&mut analytic);
    analytic.rotate_right(n / 2);

    let coefficients: Vec<f64> = analytic.iter().map(|c| c.im).collect();
    let peak = coefficients.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    log::debug!("derived operator: {n} coefficients, peak |value| {peak:.4e}");
    if peak == 0.0 {
        log::warn!("operator is identically zero; well and seismic models coincide");
    }

    Operator::from_coefficients(coefficients, well.dt())
}

/// Analytic spectrum of a full (conjugate-symmetric) spectrum: DC and Nyquist
/// kept, positive bins doubled, negative bins zeroed.
fn analytic_spectrum(full: &[Complex64]) -> Vec<Complex64> {
    let n = full.len();
    let positive_end = n.div_ceil(2);
    full.iter()
        .enumerate()
        .map(|(k, &x)| {
            if k == 0 || (n % 2 == 0 && k == n / 2) {
                x
            } else if k < positive_end {
                x * 2.0
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::estimator::estimate_values;
    use crate::spectral::fitter::PowerLawModel;
    use crate::spectral::shaper::{shape_model, TaperWindow};
    use approx::assert_abs_diff_eq;

    fn axis(n: usize, dt: f64) -> Spectrum {
        estimate_values(&vec![0.0; n], dt).unwrap()
    }

    fn shaped(n: usize, a: f64, b: f64) -> Spectrum {
        let window = TaperWindow::new(5.0, 10.0, 60.0, 80.0).unwrap();
        shape_model(&PowerLawModel { a, b }, &axis(n, 0.002), &window).unwrap()
    }

    #[test]
    fn identical_spectra_give_zero_operator() {
        let s = shaped(128, 50.0, -1.0);
        let op = derive_operator(&s, &s).unwrap();
        assert_eq!(op.len(), 128);
        assert!(op.coefficients().iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn operator_is_odd_about_center() {
        for n in [128usize, 127] {
            let op = derive_operator(&shaped(n, 50.0, -1.0), &shaped(n, 2.0, 0.0)).unwrap();
            let c = op.center();
            let coeffs = op.coefficients();
            assert_abs_diff_eq!(coeffs[c], 0.0, epsilon = 1e-12);
            for j in 1..(n - c) {
                assert_abs_diff_eq!(coeffs[c + j], -coeffs[c - j], epsilon = 1e-10);
            }
            assert!(coeffs.iter().any(|v| v.abs() > 1e-3));
        }
    }

    #[test]
    fn operator_spectrum_matches_gap_magnitude() {
        let well = shaped(200, 50.0, -1.0);
        let seismic = shaped(200, 2.0, 0.0);
        let op = derive_operator(&well, &seismic).unwrap();
        let measured = estimate_values(op.coefficients(), op.dt()).unwrap().magnitudes();
        let (w, s) = (well.magnitudes(), seismic.magnitudes());
        for k in 1..measured.len() {
            assert_abs_diff_eq!(measured[k], (w[k] - s[k]).abs(), epsilon = 1e-10);
        }
    }

    #[test]
    fn mismatched_axes_are_rejected() {
        let err = derive_operator(&shaped(128, 1.0, -1.0), &shaped(130, 1.0, -1.0)).unwrap_err();
        assert!(matches!(err, InversionError::LengthMismatch { .. }));

        let a = axis(128, 0.002);
        let b = axis(128, 0.004);
        assert!(matches!(derive_operator(&a, &b), Err(InversionError::LengthMismatch { .. })));
    }

    #[test]
    fn impulse_sits_at_center() {
        let op = Operator::impulse(9, 0.001).unwrap();
        assert_eq!(op.center(), 4);
        assert_eq!(op.coefficients()[4], 1.0);
        assert_abs_diff_eq!(op.lags()[0], -0.004, epsilon = 1e-15);
        assert!(Operator::impulse(0, 0.001).is_err());
    }
}
