use rayon::prelude::*;

use crate::data::model::{InvertedVolume, SeismicVolume, TimeSeries};
use crate::error::{InversionError, Result};
use crate::operator::Operator;

/// Relative tolerance between operator and trace sampling intervals.
const DT_TOLERANCE: f64 = 1e-6;

/// Same-mode convolution of `trace` with `kernel` centred on `kernel.len() / 2`.
///
/// `out[i] = Σ_k kernel[k] · trace[i + c − k]`, with trace samples outside
/// `0..trace.len()` taken as zero. The output has the length of `trace`; a unit
/// impulse at the centre returns `trace` unchanged.
pub fn convolve_same(trace: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = trace.len() as isize;
    let c = (kernel.len() / 2) as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &h)| {
                    let j = i + c - k as isize;
                    (0..n).contains(&j).then(|| h * trace[j as usize])
                })
                .sum()
        })
        .collect()
}

/// Convolve every trace of `volume` with `operator`.
///
/// Traces are independent; with `parallel` they are processed on the rayon
/// pool. Output order always matches input order.
pub fn apply_operator(volume: &SeismicVolume, operator: &Operator, parallel: bool) -> Result<InvertedVolume> {
    if ((operator.dt() - volume.dt()) / volume.dt()).abs() > DT_TOLERANCE {
        return Err(InversionError::invalid_input(format!(
            "operator dt = {} s does not match trace dt = {} s",
            operator.dt(),
            volume.dt()
        )));
    }
    if operator.len() > volume.n_samples() {
        log::warn!(
            "operator ({} samples) is longer than the traces ({} samples); its tails are truncated",
            operator.len(),
            volume.n_samples()
        );
    }

    let convolve = |trace: &TimeSeries| {
        trace.with_values(convolve_same(trace.values(), operator.coefficients()))
    };
    let traces = if parallel {
        volume.traces().par_iter().map(convolve).collect::<Result<Vec<_>>>()?
    } else {
        volume.traces().iter().map(convolve).collect::<Result<Vec<_>>>()?
    };

    log::info!(
        "convolved {} traces of {} samples with a {}-sample operator",
        traces.len(),
        volume.n_samples(),
        operator.len()
    );
    InvertedVolume::new(traces)
}
