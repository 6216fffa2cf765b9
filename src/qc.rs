use crate::data::model::InvertedVolume;
use crate::error::{InversionError, Result};
use crate::spectral::estimator::{estimate, Spectrum};

// ---------------------------------------------------------------------------
// QC report – inverted trace at the well vs. the well log
// ---------------------------------------------------------------------------

/// Side-by-side spectra of the inverted trace at the well and the well log.
///
/// The comparison is advisory; the residuals are provided for automated
/// checks, not as a gate.
#[derive(Debug, Clone, PartialEq)]
pub struct QcReport {
    pub trace_index: usize,
    pub inverted: Spectrum,
    pub well: Spectrum,
}

/// Estimate the spectrum of the inverted trace at `well_trace` and pair it
/// with the well-log spectrum.
pub fn compare_at_well(inverted: &InvertedVolume, well_trace: usize, well: &Spectrum) -> Result<QcReport> {
    let trace = inverted.trace(well_trace)?;
    let spectrum = estimate(trace)?;
    Ok(QcReport {
        trace_index: well_trace,
        inverted: spectrum,
        well: well.clone(),
    })
}

impl QcReport {
    /// Mean absolute `log10` magnitude difference over bins with
    /// `f_min <= f <= f_max`.
    pub fn residual(&self, f_min: f64, f_max: f64) -> Result<f64> {
        let diffs = self.log_differences(f_min, f_max)?;
        Ok(diffs.iter().map(|d| d.abs()).sum::<f64>() / diffs.len() as f64)
    }

    /// Like [`residual`](Self::residual) after removing the mean `log10`
    /// offset, i.e. insensitive to a global scale of the relative impedance.
    pub fn residual_relative(&self, f_min: f64, f_max: f64) -> Result<f64> {
        let diffs = self.log_differences(f_min, f_max)?;
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        Ok(diffs.iter().map(|d| (d - mean).abs()).sum::<f64>() / diffs.len() as f64)
    }

    /// `log10|inverted| − log10|well|` on the inverted frequency axis. Well
    /// magnitudes are linearly interpolated when the axes differ; bins outside
    /// the well axis are skipped.
    pub fn log_differences(&self, f_min: f64, f_max: f64) -> Result<Vec<f64>> {
        if !(f_min < f_max) {
            return Err(InversionError::config(format!(
                "QC band {f_min}..{f_max} Hz is empty"
            )));
        }
        let well_f = self.well.frequencies();
        let well_m = self.well.magnitudes();

        let mut diffs = Vec::new();
        for (&f, m) in self.inverted.frequencies().iter().zip(self.inverted.magnitudes()) {
            if f <= 0.0 || f < f_min || f > f_max {
                continue;
            }
            let Some(w) = interpolate(well_f, &well_m, f) else {
                continue;
            };
            if !(m > 0.0) {
                return Err(InversionError::InvalidSpectrumValue { frequency: f, value: m });
            }
            if !(w > 0.0) {
                return Err(InversionError::InvalidSpectrumValue { frequency: f, value: w });
            }
            diffs.push(m.log10() - w.log10());
        }

        if diffs.is_empty() {
            return Err(InversionError::config(format!(
                "QC band {f_min}..{f_max} Hz contains no comparable bins"
            )));
        }
        Ok(diffs)
    }
}

/// Linear interpolation on an increasing axis; `None` outside it.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> Option<f64> {
    let (&first, &last) = (xs.first()?, xs.last()?);
    if x < first || x > last {
        return None;
    }
    let i = xs.partition_point(|&v| v < x);
    if xs[i] == x {
        return Some(ys[i]);
    }
    let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
    Some(ys[i - 1] + t * (ys[i] - ys[i - 1]))
}
