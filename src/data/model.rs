use crate::error::{InversionError, Result};

/// Relative deviation of a sampling step from the mean step before a series
/// is reported as irregular.
const IRREGULAR_STEP_TOLERANCE: f64 = 0.01;

/// Relative tolerance when comparing sampling intervals of two traces.
const DT_MATCH_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// TimeSeries – one well log or one seismic trace
// ---------------------------------------------------------------------------

/// An ordered, (near-)uniformly sampled series of `(time, value)` pairs.
///
/// Construction validates `n >= 2` and strictly increasing time; the sampling
/// interval `dt` is the mean time step.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    values: Vec<f64>,
    dt: f64,
}

impl TimeSeries {
    /// Build a series from explicit sample times (seconds) and values.
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if time.len() != values.len() {
            return Err(InversionError::LengthMismatch {
                expected: time.len(),
                actual: values.len(),
            });
        }
        if time.len() < 2 {
            return Err(InversionError::invalid_input(format!(
                "time series needs at least 2 samples, got {}",
                time.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(InversionError::invalid_input(format!(
                "sample {i} is not finite"
            )));
        }

        let mut max_step = f64::NEG_INFINITY;
        let mut min_step = f64::INFINITY;
        for (i, pair) in time.windows(2).enumerate() {
            let step = pair[1] - pair[0];
            if !(step > 0.0) || !step.is_finite() {
                return Err(InversionError::invalid_input(format!(
                    "non-positive sampling interval {step} between samples {i} and {}",
                    i + 1
                )));
            }
            max_step = max_step.max(step);
            min_step = min_step.min(step);
        }

        let n = time.len();
        let dt = (time[n - 1] - time[0]) / (n - 1) as f64;
        if (max_step - min_step) > IRREGULAR_STEP_TOLERANCE * dt {
            log::warn!(
                "irregular sampling: steps range {min_step:e}..{max_step:e} s around dt = {dt:e} s"
            );
        }

        Ok(TimeSeries { time, values, dt })
    }

    /// Build a uniformly sampled series starting at `start` with interval `dt`.
    pub fn uniform(start: f64, dt: f64, values: Vec<f64>) -> Result<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(InversionError::invalid_input(format!(
                "sampling interval must be positive, got {dt}"
            )));
        }
        let time = (0..values.len()).map(|i| start + i as f64 * dt).collect();
        Self::new(time, values)
    }

    /// Same time axis, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(InversionError::LengthMismatch {
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        Ok(TimeSeries {
            time: self.time.clone(),
            values,
            dt: self.dt,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn start_time(&self) -> f64 {
        self.time[0]
    }

    pub fn end_time(&self) -> f64 {
        self.time[self.time.len() - 1]
    }
}

// ---------------------------------------------------------------------------
// SeismicVolume – 2-D collection of equal-length traces
// ---------------------------------------------------------------------------

/// Traces sharing a common sample count and sampling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SeismicVolume {
    traces: Vec<TimeSeries>,
}

impl SeismicVolume {
    pub fn new(traces: Vec<TimeSeries>) -> Result<Self> {
        validate_traces(&traces)?;
        Ok(SeismicVolume { traces })
    }

    /// Number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Samples per trace.
    pub fn n_samples(&self) -> usize {
        self.traces[0].len()
    }

    pub fn dt(&self) -> f64 {
        self.traces[0].dt()
    }

    pub fn traces(&self) -> &[TimeSeries] {
        &self.traces
    }

    pub fn trace(&self, index: usize) -> Result<&TimeSeries> {
        self.traces.get(index).ok_or_else(|| {
            InversionError::invalid_input(format!(
                "trace index {index} out of range (volume has {} traces)",
                self.traces.len()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// InvertedVolume – relative impedance, same shape as the input volume
// ---------------------------------------------------------------------------

/// Per-trace relative impedance. Values are unscaled and carry no physical
/// units.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedVolume {
    traces: Vec<TimeSeries>,
}

impl InvertedVolume {
    pub fn new(traces: Vec<TimeSeries>) -> Result<Self> {
        validate_traces(&traces)?;
        Ok(InvertedVolume { traces })
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn n_samples(&self) -> usize {
        self.traces[0].len()
    }

    pub fn traces(&self) -> &[TimeSeries] {
        &self.traces
    }

    pub fn trace(&self, index: usize) -> Result<&TimeSeries> {
        self.traces.get(index).ok_or_else(|| {
            InversionError::invalid_input(format!(
                "trace index {index} out of range (volume has {} traces)",
                self.traces.len()
            ))
        })
    }

    /// Min-max rescale every sample of the volume into `[0, 1]` for display.
    /// A constant volume maps to all zeros.
    pub fn minmax_scaled(&self) -> Result<InvertedVolume> {
        let (min, max) = self
            .traces
            .iter()
            .flat_map(|t| t.values().iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let traces = self
            .traces
            .iter()
            .map(|t| {
                let values = if range.abs() < f64::EPSILON {
                    vec![0.0; t.len()]
                } else {
                    t.values().iter().map(|&v| (v - min) / range).collect()
                };
                t.with_values(values)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(InvertedVolume { traces })
    }
}

fn validate_traces(traces: &[TimeSeries]) -> Result<()> {
    let first = traces
        .first()
        .ok_or_else(|| InversionError::invalid_input("volume has no traces"))?;

    for (i, trace) in traces.iter().enumerate().skip(1) {
        if trace.len() != first.len() {
            return Err(InversionError::LengthMismatch {
                expected: first.len(),
                actual: trace.len(),
            });
        }
        if ((trace.dt() - first.dt()) / first.dt()).abs() > DT_MATCH_TOLERANCE {
            return Err(InversionError::invalid_input(format!(
                "trace {i} has dt = {} s, expected {} s",
                trace.dt(),
                first.dt()
            )));
        }
    }
    Ok(())
}
