use std::f64::consts::LN_10;
use std::ops::Range;

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use super::estimator::Spectrum;
use crate::error::{InversionError, Result};

/// Cost below which the fit is exact to floating-point precision.
const COST_FLOOR: f64 = 1e-28;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;

// ---------------------------------------------------------------------------
// PowerLawModel – A·f^b
// ---------------------------------------------------------------------------

/// Modeled amplitude `a · f^b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawModel {
    pub a: f64,
    pub b: f64,
}

impl PowerLawModel {
    pub fn evaluate(&self, frequency: f64) -> f64 {
        self.a * frequency.powf(self.b)
    }
}

/// Solver settings for [`fit_power_law`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Starting point `(A₀, b₀)`; `A₀` must be positive.
    pub initial: PowerLawModel,
    /// Budget of cost evaluations.
    pub max_evaluations: usize,
    /// Relative cost reduction and relative step size at which the solver stops.
    pub tolerance: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            initial: PowerLawModel { a: 1.0, b: -1.0 },
            max_evaluations: 5000,
            tolerance: 1e-12,
        }
    }
}

impl FitSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial.a > 0.0) || !self.initial.a.is_finite() || !self.initial.b.is_finite() {
            return Err(InversionError::config(format!(
                "initial guess must have finite A > 0, got ({}, {})",
                self.initial.a, self.initial.b
            )));
        }
        if self.max_evaluations == 0 {
            return Err(InversionError::config("max_evaluations must be at least 1"));
        }
        if !(self.tolerance > 0.0) {
            return Err(InversionError::config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerLawFit {
    pub model: PowerLawModel,
    /// Sum of squared `log10` residuals at the solution.
    pub cost: f64,
    pub evaluations: usize,
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Fit `A·f^b` to the magnitudes of `spectrum[range]` in log-log space.
pub fn fit_power_law(spectrum: &Spectrum, range: Range<usize>, settings: &FitSettings) -> Result<PowerLawFit> {
    if range.end > spectrum.len() || range.start >= range.end {
        return Err(InversionError::config(format!(
            "fit range {}..{} is empty or exceeds the {} spectrum bins",
            range.start,
            range.end,
            spectrum.len()
        )));
    }
    let magnitudes = spectrum.magnitudes();
    fit_magnitudes(
        &spectrum.frequencies()[range.clone()],
        &magnitudes[range],
        settings,
    )
}

/// Levenberg-Marquardt on the residual `log10(y) − log10(A·f^b)`.
pub fn fit_magnitudes(frequencies: &[f64], magnitudes: &[f64], settings: &FitSettings) -> Result<PowerLawFit> {
    settings.validate()?;
    if frequencies.len() != magnitudes.len() {
        return Err(InversionError::LengthMismatch {
            expected: frequencies.len(),
            actual: magnitudes.len(),
        });
    }
    if frequencies.len() < 2 {
        return Err(InversionError::config(format!(
            "power-law fit needs at least 2 bins, got {}",
            frequencies.len()
        )));
    }

    let mut log_f = Vec::with_capacity(frequencies.len());
    let mut log_y = Vec::with_capacity(frequencies.len());
    for (&f, &y) in frequencies.iter().zip(magnitudes) {
        if !(f > 0.0) || !f.is_finite() {
            return Err(InversionError::InvalidSpectrumValue { frequency: f, value: y });
        }
        if !(y > 0.0) || !y.is_finite() {
            return Err(InversionError::InvalidSpectrumValue { frequency: f, value: y });
        }
        log_f.push(f.log10());
        log_y.push(y.log10());
    }

    let cost_at = |a: f64, b: f64| -> f64 {
        let log_a = a.log10();
        log_f
            .iter()
            .zip(&log_y)
            .map(|(x, y)| {
                let r = y - log_a - b * x;
                r * r
            })
            .sum()
    };

    let mut params = Vector2::new(settings.initial.a, settings.initial.b);
    let mut cost = cost_at(params[0], params[1]);
    let mut evaluations = 1;
    let mut lambda = LAMBDA_INIT;
    let tol = settings.tolerance;

    let converged = |params: &Vector2<f64>, cost: f64, evaluations: usize| -> Result<PowerLawFit> {
        log::debug!(
            "power-law fit converged: A = {:.6e}, b = {:.6}, cost = {cost:.3e}, {evaluations} evaluations",
            params[0],
            params[1]
        );
        Ok(PowerLawFit {
            model: PowerLawModel { a: params[0], b: params[1] },
            cost,
            evaluations,
        })
    };

    while evaluations < settings.max_evaluations {
        if cost <= COST_FLOOR {
            return converged(&params, cost, evaluations);
        }

        // Normal equations of the residual Jacobian.
        let (a, b) = (params[0], params[1]);
        let log_a = a.log10();
        let d_a = -1.0 / (a * LN_10);
        let mut jtj = Matrix2::zeros();
        let mut jtr = Vector2::zeros();
        for (x, y) in log_f.iter().zip(&log_y) {
            let r = y - log_a - b * x;
            let j = Vector2::new(d_a, -x);
            jtj += j * j.transpose();
            jtr += j * r;
        }

        let damped = jtj + Matrix2::from_diagonal(&jtj.diagonal()) * lambda;
        let Some(inverse) = damped.try_inverse() else {
            lambda *= 10.0;
            evaluations += 1;
            continue;
        };
        let step = -(inverse * jtr);

        if step[0].abs() <= tol * (a.abs() + tol) && step[1].abs() <= tol * (b.abs() + tol) {
            return converged(&params, cost, evaluations);
        }

        let trial = params + step;
        evaluations += 1;
        if trial[0] > 0.0 && trial[0].is_finite() && trial[1].is_finite() {
            let trial_cost = cost_at(trial[0], trial[1]);
            if trial_cost < cost {
                let reduction = cost - trial_cost;
                let previous = cost;
                params = trial;
                cost = trial_cost;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                if reduction <= tol * previous {
                    return converged(&params, cost, evaluations);
                }
                continue;
            }
        }
        lambda *= 10.0;
    }

    if cost <= COST_FLOOR {
        return converged(&params, cost, evaluations);
    }
    Err(InversionError::FitDidNotConverge { evaluations, cost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::estimator::estimate_values;
    use crate::synthetic::power_law_series;
    use approx::assert_relative_eq;

    fn exact(model: PowerLawModel) -> (Vec<f64>, Vec<f64>) {
        let f: Vec<f64> = (1..60).map(|k| k as f64 * 2.5).collect();
        let y = f.iter().map(|&f| model.evaluate(f)).collect();
        (f, y)
    }

    #[test]
    fn recovers_exact_power_law() {
        for truth in [
            PowerLawModel { a: 2500.0, b: -0.8 },
            PowerLawModel { a: 1e-3, b: 1.5 },
            PowerLawModel { a: 1.0, b: 0.0 },
        ] {
            let (f, y) = exact(truth);
            let fit = fit_magnitudes(&f, &y, &FitSettings::default()).unwrap();
            assert_relative_eq!(fit.model.a, truth.a, max_relative = 1e-6);
            assert_relative_eq!(fit.model.b, truth.b, epsilon = 1e-6, max_relative = 1e-6);
        }
    }

    #[test]
    fn recovers_power_law_of_estimated_spectrum() {
        let series = power_law_series(200, 0.001, 40.0, -1.2, 7).unwrap();
        let spectrum = estimate_values(&series, 0.001).unwrap();
        let range = spectrum.band_indices(5.0, 250.0);
        let fit = fit_power_law(&spectrum, range, &FitSettings::default()).unwrap();
        assert_relative_eq!(fit.model.a, 40.0, max_relative = 1e-6);
        assert_relative_eq!(fit.model.b, -1.2, max_relative = 1e-6);
    }

    #[test]
    fn noisy_spectrum_gives_nearby_exponent() {
        let truth = PowerLawModel { a: 10.0, b: -1.0 };
        let (f, y) = exact(truth);
        let noisy: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v * 1.3 } else { v / 1.3 })
            .collect();
        let fit = fit_magnitudes(&f, &noisy, &FitSettings::default()).unwrap();
        assert!((fit.model.b + 1.0).abs() < 0.05, "b = {}", fit.model.b);
        assert!(fit.cost > 0.0);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let (f, mut y) = exact(PowerLawModel { a: 1.0, b: -1.0 });
        y[5] = 0.0;
        let err = fit_magnitudes(&f, &y, &FitSettings::default()).unwrap_err();
        assert_eq!(err, InversionError::InvalidSpectrumValue { frequency: f[5], value: 0.0 });

        let spectrum = estimate_values(&power_law_series(64, 0.002, 1.0, -1.0, 1).unwrap(), 0.002).unwrap();
        let err = fit_power_law(&spectrum, 0..10, &FitSettings::default()).unwrap_err();
        assert!(matches!(err, InversionError::InvalidSpectrumValue { frequency, .. } if frequency == 0.0));
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let (f, y) = exact(PowerLawModel { a: 2500.0, b: -0.8 });
        let settings = FitSettings {
            max_evaluations: 2,
            ..FitSettings::default()
        };
        let err = fit_magnitudes(&f, &y, &settings).unwrap_err();
        assert!(matches!(err, InversionError::FitDidNotConverge { evaluations: 2, .. }));
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let (f, y) = exact(PowerLawModel { a: 1.0, b: -1.0 });
        let settings = FitSettings {
            initial: PowerLawModel { a: 0.0, b: -1.0 },
            ..FitSettings::default()
        };
        assert!(matches!(
            fit_magnitudes(&f, &y, &settings),
            Err(InversionError::ConfigurationError(_))
        ));
        assert!(matches!(
            fit_magnitudes(&f[..1], &y[..1], &FitSettings::default()),
            Err(InversionError::ConfigurationError(_))
        ));
    }
}
