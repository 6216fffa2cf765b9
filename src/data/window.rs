use serde::{Deserialize, Serialize};

use super::model::{SeismicVolume, TimeSeries};
use crate::error::{InversionError, Result};

// ---------------------------------------------------------------------------
// Horizon window: the time range bounding the area of interest
// ---------------------------------------------------------------------------

/// Bounding horizon times in seconds. Samples with `start <= t <= end` pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn validate(&self) -> Result<()> {
        if !(self.start < self.end) {
            return Err(InversionError::config(format!(
                "window start {} must be before end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Index range `[first, last)` of the samples inside the window.
    fn index_range(&self, time: &[f64]) -> (usize, usize) {
        let first = time.partition_point(|&t| t < self.start);
        let last = time.partition_point(|&t| t <= self.end);
        (first, last.max(first))
    }
}

impl TimeSeries {
    /// Keep only the samples inside `window`.
    pub fn window(&self, window: &TimeWindow) -> Result<TimeSeries> {
        window.validate()?;
        let (first, last) = window.index_range(self.time());
        if last - first < 2 {
            return Err(InversionError::invalid_input(format!(
                "window {}..{} s keeps {} samples of a series spanning {}..{} s",
                window.start,
                window.end,
                last - first,
                self.start_time(),
                self.end_time()
            )));
        }
        TimeSeries::new(
            self.time()[first..last].to_vec(),
            self.values()[first..last].to_vec(),
        )
    }
}

impl SeismicVolume {
    /// Window every trace identically.
    pub fn window(&self, window: &TimeWindow) -> Result<SeismicVolume> {
        let traces = self
            .traces()
            .iter()
            .map(|t| t.window(window))
            .collect::<Result<Vec<_>>>()?;
        SeismicVolume::new(traces)
    }
}

// ---------------------------------------------------------------------------
// Trace selection
// ---------------------------------------------------------------------------

/// Index of the trace position closest to `x`. Ties resolve to the lower index.
pub fn nearest_trace(positions: &[f64], x: f64) -> Result<usize> {
    if positions.is_empty() {
        return Err(InversionError::invalid_input("no trace positions given"));
    }
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &p) in positions.iter().enumerate() {
        let distance = (p - x).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    Ok(best)
}

/// Trace indices `center - halfwidth ..= center + halfwidth`, clamped to a
/// volume of `len` traces.
pub fn neighbourhood(center: usize, halfwidth: usize, len: usize) -> Result<std::ops::RangeInclusive<usize>> {
    if center >= len {
        return Err(InversionError::invalid_input(format!(
            "trace index {center} out of range (volume has {len} traces)"
        )));
    }
    let lo = center.saturating_sub(halfwidth);
    let hi = (center + halfwidth).min(len - 1);
    Ok(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> TimeSeries {
        TimeSeries::uniform(0.0, 0.001, (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn window_keeps_inclusive_bounds() {
        let ts = ramp(100);
        let w = TimeWindow { start: 0.0095, end: 0.0195 };
        let cut = ts.window(&w).unwrap();
        assert_eq!(cut.values().first(), Some(&10.0));
        assert_eq!(cut.values().last(), Some(&19.0));
    }

    #[test]
    fn window_outside_series_is_invalid() {
        let ts = ramp(10);
        let err = ts.window(&TimeWindow { start: 1.0, end: 2.0 }).unwrap_err();
        assert!(matches!(err, InversionError::InvalidInput(_)));

        let err = ts.window(&TimeWindow { start: 0.5, end: 0.1 }).unwrap_err();
        assert!(matches!(err, InversionError::ConfigurationError(_)));
    }

    #[test]
    fn nearest_trace_prefers_lower_index_on_tie() {
        let positions = [0.0, 25.0, 50.0, 75.0];
        assert_eq!(nearest_trace(&positions, 60.0).unwrap(), 2);
        assert_eq!(nearest_trace(&positions, 37.5).unwrap(), 1);
        assert_eq!(nearest_trace(&positions, 1e6).unwrap(), 3);
        assert!(nearest_trace(&[], 0.0).is_err());
    }

    #[test]
    fn neighbourhood_is_clamped() {
        assert_eq!(neighbourhood(1, 3, 10).unwrap(), 0..=4);
        assert_eq!(neighbourhood(8, 3, 10).unwrap(), 5..=9);
        assert_eq!(neighbourhood(4, 0, 10).unwrap(), 4..=4);
        assert!(neighbourhood(10, 0, 10).is_err());
    }
}
