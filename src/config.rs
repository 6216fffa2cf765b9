use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data::window::TimeWindow;
use crate::error::{InversionError, Result};
use crate::spectral::fitter::{FitSettings, PowerLawModel};
use crate::spectral::shaper::TaperWindow;

// ---------------------------------------------------------------------------
// InversionConfig – every tunable of a run, passed explicitly
// ---------------------------------------------------------------------------

/// How the band-limited seismic spectrum is modeled before the gap is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeismicModel {
    /// Taper the observed (averaged) magnitude spectrum directly.
    #[default]
    Observed,
    /// Fit `A·f^b` to the seismic spectrum first, then taper the model.
    PowerLaw,
}

/// Power-law fit settings plus the frequency band (Hz) the fit runs over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// `[f_min, f_max)` in Hz; the DC bin is always excluded.
    pub band: (f64, f64),
    pub initial: PowerLawModel,
    pub max_evaluations: usize,
    pub tolerance: f64,
    /// Use `initial` when the well fit does not converge instead of aborting.
    pub fallback_to_initial: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        let settings = FitSettings::default();
        Self {
            band: (5.0, 100.0),
            initial: settings.initial,
            max_evaluations: settings.max_evaluations,
            tolerance: settings.tolerance,
            fallback_to_initial: false,
        }
    }
}

impl FitConfig {
    pub fn settings(&self) -> FitSettings {
        FitSettings {
            initial: self.initial,
            max_evaluations: self.max_evaluations,
            tolerance: self.tolerance,
        }
    }
}

/// Run configuration, loadable from TOML.
///
/// ```toml
/// seismic_model = "observed"
/// well_trace = 25
/// trace_halfwidth = 2
///
/// [taper]
/// lo_start = 5.0
/// lo_end = 10.0
/// hi_start = 60.0
/// hi_end = 80.0
///
/// [fit]
/// band = [5.0, 100.0]
/// initial = { a = 1.0, b = -1.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InversionConfig {
    pub taper: TaperWindow,
    pub fit: FitConfig,
    pub seismic_model: SeismicModel,
    /// Trace index nearest the well; defaults to the middle trace.
    pub well_trace: Option<usize>,
    /// Neighbouring traces on each side averaged into the seismic spectrum.
    pub trace_halfwidth: usize,
    /// Horizon window for spectral estimation.
    pub window: Option<TimeWindow>,
    /// QC residual band in Hz; defaults to the taper's flat passband.
    pub qc_band: Option<(f64, f64)>,
    /// Convolve traces on the rayon pool.
    pub parallel: bool,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            taper: TaperWindow::default(),
            fit: FitConfig::default(),
            seismic_model: SeismicModel::default(),
            well_trace: None,
            trace_halfwidth: 0,
            window: None,
            qc_band: None,
            parallel: true,
        }
    }
}

impl InversionConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: InversionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not depend on the data; the Nyquist bound of the taper
    /// is checked once the seismic sampling is known.
    pub fn validate(&self) -> Result<()> {
        self.taper.validate()?;

        let (f_min, f_max) = self.fit.band;
        if !(0.0 <= f_min && f_min < f_max) {
            return Err(InversionError::config(format!(
                "fit band must satisfy 0 <= f_min < f_max, got {f_min}..{f_max}"
            )));
        }
        self.fit.settings().validate()?;

        if let Some(window) = &self.window {
            window.validate()?;
        }
        if let Some((lo, hi)) = self.qc_band {
            if !(lo < hi) {
                return Err(InversionError::config(format!("QC band {lo}..{hi} Hz is empty")));
            }
        }
        Ok(())
    }

    /// The configured QC band, or the taper passband.
    pub fn qc_band(&self) -> (f64, f64) {
        self.qc_band.unwrap_or_else(|| self.taper.passband())
    }
}
