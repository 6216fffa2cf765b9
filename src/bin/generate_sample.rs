//! Writes a synthetic well log and seismic line for trying the CLI:
//!
//! ```text
//! cargo run --bin generate_sample
//! cargo run -- --well well_log.csv --seismic seismic.parquet --well-x 1250
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use colored_inversion::data::writer::write_traces;
use colored_inversion::synthetic::{band_limited_wavelet, power_law_series, SyntheticSurvey};
use colored_inversion::{TaperWindow, TimeSeries};

const N_SAMPLES: usize = 500;
const DT: f64 = 0.002;
const N_TRACES: usize = 101;
const TRACE_SPACING: f64 = 25.0;
/// Background impedance the relative well log fluctuates around.
const BASE_IMPEDANCE: f64 = 6500.0;

fn main() -> Result<()> {
    // Well: 1/f impedance spectrum on top of a constant background
    let fluctuation = power_law_series(N_SAMPLES, DT, 400.0, -1.0, 42)?;
    let values = fluctuation.iter().map(|v| BASE_IMPEDANCE + v).collect();
    let well = TimeSeries::uniform(0.0, DT, values)?;

    let well_path = Path::new("well_log.csv");
    let mut writer = csv::Writer::from_path(well_path).context("creating well_log.csv")?;
    writer.write_record(["time", "value"])?;
    for (t, v) in well.time().iter().zip(well.values()) {
        writer.write_record([t.to_string(), v.to_string()])?;
    }
    writer.flush()?;

    // Seismic: 8-70 Hz zero-phase wavelet over dipping reflectivity
    let band = TaperWindow::new(4.0, 8.0, 60.0, 70.0)?;
    let wavelet = band_limited_wavelet(N_SAMPLES, DT, &band, 1.0)?;
    let survey = SyntheticSurvey {
        n_traces: N_TRACES,
        n_samples: N_SAMPLES,
        dt: DT,
        anchor_trace: N_TRACES / 2,
        dip: 0.6,
        background: 0.3,
        seed: 7,
    };
    let volume = survey.volume(&wavelet)?;
    let positions: Vec<f64> = (0..N_TRACES).map(|i| i as f64 * TRACE_SPACING).collect();

    let seismic_path = Path::new("seismic.parquet");
    write_traces(seismic_path, volume.traces(), Some(&positions))?;

    println!(
        "Wrote {} ({} samples) and {} ({} traces x {} samples, dt = {DT} s)",
        well_path.display(),
        well.len(),
        seismic_path.display(),
        volume.len(),
        volume.n_samples()
    );
    Ok(())
}
