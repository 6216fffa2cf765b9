use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

use crate::data::model::{SeismicVolume, TimeSeries};
use crate::data::window::neighbourhood;
use crate::error::{InversionError, Result};

/// Relative tolerance when checking that two spectra share a frequency axis.
const AXIS_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Spectrum – one-sided, n-normalized
// ---------------------------------------------------------------------------

/// One-sided spectrum of a real series of `n_samples` samples.
///
/// Holds `⌊n/2⌋` bins at `k / (n·dt)` Hz, `k = 0..⌊n/2⌋`, so the Nyquist bin
/// of an even-length series is not part of it. Amplitudes are divided by `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    frequencies: Vec<f64>,
    amplitudes: Vec<Complex64>,
    n_samples: usize,
    dt: f64,
}

impl Spectrum {
    /// Frequency axis of the one-sided spectrum of `n` samples at `dt`.
    pub fn frequency_axis(n_samples: usize, dt: f64) -> Vec<f64> {
        let span = n_samples as f64 * dt;
        (0..n_samples / 2).map(|k| k as f64 / span).collect()
    }

    /// Build a spectrum on the axis of an `n_samples` series sampled at `dt`.
    pub fn new(amplitudes: Vec<Complex64>, n_samples: usize, dt: f64) -> Result<Self> {
        validate_sampling(n_samples, dt)?;
        if amplitudes.len() != n_samples / 2 {
            return Err(InversionError::LengthMismatch {
                expected: n_samples / 2,
                actual: amplitudes.len(),
            });
        }
        Ok(Spectrum {
            frequencies: Self::frequency_axis(n_samples, dt),
            amplitudes,
            n_samples,
            dt,
        })
    }

    /// Real (zero-phase) amplitudes on the axis of `self`.
    pub fn with_magnitudes(&self, magnitudes: Vec<f64>) -> Result<Spectrum> {
        let amplitudes = magnitudes
            .into_iter()
            .map(|m| Complex64::new(m, 0.0))
            .collect();
        Spectrum::new(amplitudes, self.n_samples, self.dt)
    }

    /// Number of bins, `⌊n/2⌋`.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm()).collect()
    }

    /// Length of the time-domain series this spectrum describes.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn nyquist(&self) -> f64 {
        0.5 / self.dt
    }

    /// Fails with `LengthMismatch` unless `other` lives on the same axis.
    pub fn ensure_same_axis(&self, other: &Spectrum) -> Result<()> {
        if self.len() != other.len() || self.n_samples != other.n_samples {
            return Err(InversionError::LengthMismatch {
                expected: self.n_samples,
                actual: other.n_samples,
            });
        }
        if ((self.dt - other.dt) / self.dt).abs() > AXIS_TOLERANCE {
            log::debug!(
                "frequency axes differ: {} bins at dt = {} s vs dt = {} s ({} Hz vs {} Hz bin spacing)",
                self.len(),
                self.dt,
                other.dt,
                1.0 / (self.n_samples as f64 * self.dt),
                1.0 / (other.n_samples as f64 * other.dt)
            );
            return Err(InversionError::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(())
    }

    /// Index slice `[start, end)` of the bins with `f_min <= f < f_max`. The
    /// DC bin is never included.
    pub fn band_indices(&self, f_min: f64, f_max: f64) -> std::ops::Range<usize> {
        let start = self.frequencies.partition_point(|&f| f < f_min).max(1);
        let end = self.frequencies.partition_point(|&f| f < f_max);
        start..end.max(start)
    }

    /// Rebuild the full conjugate-symmetric spectrum of length `n_samples`.
    ///
    /// Bins missing from the one-sided half (the Nyquist bin for even `n`, the
    /// highest positive bin and its mirror for odd `n`) are zero, and the
    /// imaginary part of DC is dropped so the inverse is real.
    pub fn to_full_spectrum(&self) -> Vec<Complex64> {
        let n = self.n_samples;
        let mut full = vec![Complex64::new(0.0, 0.0); n];
        full[..self.len()].copy_from_slice(&self.amplitudes);
        full[0] = Complex64::new(full[0].re, 0.0);
        for k in 1..self.len() {
            full[n - k] = self.amplitudes[k].conj();
        }
        full
    }

    /// Inverse transform of the reconstructed full spectrum.
    pub fn inverse(&self) -> Vec<f64> {
        let mut buf = self.to_full_spectrum();
        inverse_in_place(&mut buf);
        buf.into_iter().map(|c| c.re).collect()
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// One-sided amplitude spectrum of a time series.
pub fn estimate(series: &TimeSeries) -> Result<Spectrum> {
    estimate_values(series.values(), series.dt())
}

/// One-sided amplitude spectrum of raw samples at interval `dt`. No window
/// is applied.
pub fn estimate_values(values: &[f64], dt: f64) -> Result<Spectrum> {
    let n = values.len();
    validate_sampling(n, dt)?;

    let mut buf: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buf);

    let scale = 1.0 / n as f64;
    buf.truncate(n / 2);
    for a in &mut buf {
        *a *= scale;
    }
    Spectrum::new(buf, n, dt)
}

/// Mean magnitude spectrum of the traces around `center`.
///
/// The result carries real amplitudes; phase is not meaningful after
/// averaging across traces.
pub fn local_spectrum(volume: &SeismicVolume, center: usize, halfwidth: usize) -> Result<Spectrum> {
    let range = neighbourhood(center, halfwidth, volume.len())?;
    let count = range.clone().count();

    let axis = estimate(volume.trace(*range.start())?)?;
    let mut acc = axis.magnitudes();
    for i in range.skip(1) {
        let magnitudes = estimate(volume.trace(i)?)?.magnitudes();
        for (a, m) in acc.iter_mut().zip(magnitudes) {
            *a += m;
        }
    }

    log::debug!("averaged seismic spectrum over {count} traces around trace {center}");
    axis.with_magnitudes(acc.into_iter().map(|a| a / count as f64).collect())
}

/// Unnormalized inverse DFT, the counterpart of the `1/n` forward scaling.
pub(crate) fn inverse_in_place(buf: &mut [Complex64]) {
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(buf.len()).process(buf);
}

fn validate_sampling(n_samples: usize, dt: f64) -> Result<()> {
    if n_samples < 2 {
        return Err(InversionError::invalid_input(format!(
            "spectrum needs at least 2 samples, got {n_samples}"
        )));
    }
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(InversionError::invalid_input(format!(
            "sampling interval must be positive, got {dt}"
        )));
    }
    Ok(())
}
