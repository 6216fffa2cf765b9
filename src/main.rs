use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use colored_inversion::data::loader::{load_volume, load_well_log};
use colored_inversion::data::window::nearest_trace;
use colored_inversion::data::writer::{write_report, write_volume};
use colored_inversion::{ColoredInversion, InversionConfig};

/// Colored inversion: turn seismic reflectivity into relative acoustic
/// impedance with an operator shaped by a well log.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Well log in time (.parquet, .json or .csv) holding a single series.
    #[arg(long)]
    well: PathBuf,

    /// Seismic traces (.parquet, .json or .csv), one record per trace.
    #[arg(long)]
    seismic: PathBuf,

    /// TOML run configuration; defaults are used for anything missing.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trace index nearest the well (overrides the config).
    #[arg(long, conflicts_with = "well_x")]
    well_trace: Option<usize>,

    /// Lateral well position; picks the nearest trace from the `position` column.
    #[arg(long)]
    well_x: Option<f64>,

    /// Low taper ramp start (Hz).
    #[arg(long)]
    lo_start: Option<f64>,

    /// Low taper ramp end (Hz).
    #[arg(long)]
    lo_end: Option<f64>,

    /// High taper ramp start (Hz).
    #[arg(long)]
    hi_start: Option<f64>,

    /// High taper ramp end (Hz).
    #[arg(long)]
    hi_end: Option<f64>,

    /// Write the inverted volume here (.parquet, .json or .csv).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Min-max rescale the written volume to [0, 1] for display.
    #[arg(long, default_value_t = false)]
    scaled: bool,

    /// Write the QC summary as JSON here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Convolve traces on a single thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => InversionConfig::load_from_file(path)?,
        None => InversionConfig::default(),
    };
    if let Some(v) = args.lo_start {
        config.taper.lo_start = v;
    }
    if let Some(v) = args.lo_end {
        config.taper.lo_end = v;
    }
    if let Some(v) = args.hi_start {
        config.taper.hi_start = v;
    }
    if let Some(v) = args.hi_end {
        config.taper.hi_end = v;
    }
    if args.sequential {
        config.parallel = false;
    }

    let well = load_well_log(&args.well)?;
    let seismic = load_volume(&args.seismic)?;

    if let Some(index) = args.well_trace {
        config.well_trace = Some(index);
    } else if let Some(x) = args.well_x {
        let Some(positions) = &seismic.positions else {
            bail!("--well-x needs a 'position' column in {}", args.seismic.display());
        };
        let index = nearest_trace(positions, x)?;
        log::info!("well at x = {x} → trace {index} (x = {})", positions[index]);
        config.well_trace = Some(index);
    }

    let taper = config.taper;
    let inversion = ColoredInversion::new(config).context("invalid configuration")?;
    let run = inversion.run(&well, &seismic.volume).context("inversion failed")?;

    println!(
        "A = {:.6e}  b = {:.4}  operator = {} samples  QC relative residual = {:.4} (absolute {:.4}; log10, {:.1}..{:.1} Hz, trace {})",
        run.well_model.a,
        run.well_model.b,
        run.operator.len(),
        run.qc_residual_relative,
        run.qc_residual,
        run.qc_band.0,
        run.qc_band.1,
        run.well_trace
    );

    if let Some(path) = &args.output {
        if args.scaled {
            write_volume(path, &run.inverted.minmax_scaled()?)?;
        } else {
            write_volume(path, &run.inverted)?;
        }
    }
    if let Some(path) = &args.report {
        write_report(path, &run.summary(&taper))?;
    }
    Ok(())
}
