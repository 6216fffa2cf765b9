//! Deterministic synthetic well logs and seismic volumes.
//!
//! Used by the `generate_sample` binary and by the tests. Every generator is
//! seeded so repeated calls return identical data.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::convolve::convolve_same;
use crate::data::model::{SeismicVolume, TimeSeries};
use crate::error::Result;
use crate::spectral::estimator::Spectrum;
use crate::spectral::shaper::TaperWindow;

// ---------------------------------------------------------------------------
// PRNG
// ---------------------------------------------------------------------------

/// Minimal deterministic PRNG (xoshiro256**)
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Series generators
// ---------------------------------------------------------------------------

/// Real series of `n` samples whose estimated magnitude spectrum is exactly
/// `a·f^b` on bins `1..⌊n/2⌋`, with random phases and zero mean.
pub fn power_law_series(n: usize, dt: f64, a: f64, b: f64, seed: u64) -> Result<Vec<f64>> {
    let mut rng = SimpleRng::new(seed);
    let amplitudes = Spectrum::frequency_axis(n, dt)
        .into_iter()
        .enumerate()
        .map(|(k, f)| {
            let phase = 2.0 * PI * rng.next_f64();
            if k == 0 {
                Complex64::new(0.0, 0.0)
            } else {
                Complex64::from_polar(a * f.powf(b), phase)
            }
        })
        .collect();
    Ok(Spectrum::new(amplitudes, n, dt)?.inverse())
}

/// Zero-phase wavelet of `n` samples centred on `n / 2` whose estimated
/// magnitude spectrum is `gain · window.weight(f)`.
pub fn band_limited_wavelet(n: usize, dt: f64, window: &TaperWindow, gain: f64) -> Result<Vec<f64>> {
    window.validate()?;
    let amplitudes = Spectrum::frequency_axis(n, dt)
        .iter()
        .map(|&f| Complex64::new(gain * window.weight(f), 0.0))
        .collect();
    let mut wavelet = Spectrum::new(amplitudes, n, dt)?.inverse();
    wavelet.rotate_right(n / 2);
    Ok(wavelet)
}

/// White (flat-spectrum) reflectivity with random phases, peak-normalised to
/// `level`.
pub fn white_reflectivity(n: usize, level: f64, seed: u64) -> Result<Vec<f64>> {
    let series = power_law_series(n, 1.0, 1.0, 0.0, seed)?;
    let peak = series.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if peak == 0.0 {
        return Ok(series);
    }
    Ok(series.into_iter().map(|v| v * level / peak).collect())
}

/// `n` zeros with `amplitude` at index `at` (ignored when out of range).
pub fn spike(n: usize, at: usize, amplitude: f64) -> Vec<f64> {
    let mut r = vec![0.0; n];
    if let Some(v) = r.get_mut(at) {
        *v = amplitude;
    }
    r
}

// ---------------------------------------------------------------------------
// Synthetic survey
// ---------------------------------------------------------------------------

/// Layout of a synthetic 2-D line with one dipping reflector.
#[derive(Debug, Clone)]
pub struct SyntheticSurvey {
    pub n_traces: usize,
    pub n_samples: usize,
    pub dt: f64,
    /// Trace whose reflector sits exactly at `n_samples / 2`.
    pub anchor_trace: usize,
    /// Reflector shift in samples per trace away from the anchor.
    pub dip: f64,
    /// Peak level of the white background reflectivity; 0 disables it.
    pub background: f64,
    pub seed: u64,
}

impl SyntheticSurvey {
    /// Reflectivity of trace `index`: a unit spike on the reflector plus the
    /// optional background.
    pub fn reflectivity(&self, index: usize) -> Result<Vec<f64>> {
        let offset = ((index as f64 - self.anchor_trace as f64) * self.dip).round() as isize;
        let at = (self.n_samples / 2) as isize + offset;
        let at = at.clamp(0, self.n_samples as isize - 1) as usize;
        let mut r = spike(self.n_samples, at, 1.0);
        if self.background > 0.0 {
            let noise = white_reflectivity(self.n_samples, self.background, self.seed + index as u64)?;
            for (a, b) in r.iter_mut().zip(noise) {
                *a += b;
            }
        }
        Ok(r)
    }

    /// Convolve every reflectivity series with `wavelet`.
    pub fn volume(&self, wavelet: &[f64]) -> Result<SeismicVolume> {
        let traces = (0..self.n_traces)
            .map(|i| {
                let trace = convolve_same(&self.reflectivity(i)?, wavelet);
                TimeSeries::uniform(0.0, self.dt, trace)
            })
            .collect::<Result<Vec<_>>>()?;
        SeismicVolume::new(traces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::estimator::estimate_values;
    use approx::assert_relative_eq;

    #[test]
    fn rng_is_deterministic() {
        let mut a = SimpleRng::new(42);
        let mut b = SimpleRng::new(42);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);
        let mut c = SimpleRng::new(43);
        assert_ne!(xs[0], c.next_u64());
        assert!((0..1000).map(|_| a.next_f64()).all(|v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn power_law_series_has_exact_spectrum() {
        let series = power_law_series(200, 0.001, 1000.0, -1.0, 3).unwrap();
        let spectrum = estimate_values(&series, 0.001).unwrap();
        for (f, m) in spectrum.frequencies().iter().zip(spectrum.magnitudes()).skip(1) {
            assert_relative_eq!(m, 1000.0 / f, max_relative = 1e-9);
        }
        assert!(spectrum.magnitudes()[0] < 1e-9);
    }

    #[test]
    fn wavelet_spectrum_follows_window() {
        let window = TaperWindow::new(2.0, 4.0, 100.0, 150.0).unwrap();
        let wavelet = band_limited_wavelet(200, 0.001, &window, 0.005).unwrap();
        let spectrum = estimate_values(&wavelet, 0.001).unwrap();
        for (f, m) in spectrum.frequencies().iter().zip(spectrum.magnitudes()) {
            assert!((m - 0.005 * window.weight(*f)).abs() < 1e-12);
        }
        let peak = wavelet.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(wavelet[100], peak);
    }

    #[test]
    fn anchor_trace_reproduces_wavelet() {
        let window = TaperWindow::new(2.0, 4.0, 100.0, 150.0).unwrap();
        let wavelet = band_limited_wavelet(64, 0.002, &window, 1.0).unwrap();
        let survey = SyntheticSurvey {
            n_traces: 5,
            n_samples: 64,
            dt: 0.002,
            anchor_trace: 2,
            dip: 1.5,
            background: 0.0,
            seed: 1,
        };
        let volume = survey.volume(&wavelet).unwrap();
        assert_eq!(volume.len(), 5);
        assert_eq!(volume.trace(2).unwrap().values(), wavelet.as_slice());
        assert_ne!(volume.trace(0).unwrap().values(), wavelet.as_slice());
    }
}
