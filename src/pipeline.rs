use std::borrow::Cow;

use serde::Serialize;

use crate::config::{InversionConfig, SeismicModel};
use crate::convolve::apply_operator;
use crate::data::model::{InvertedVolume, SeismicVolume, TimeSeries};
use crate::error::{InversionError, Result};
use crate::operator::{derive_operator, Operator};
use crate::qc::{compare_at_well, QcReport};
use crate::spectral::estimator::{estimate, local_spectrum, Spectrum};
use crate::spectral::fitter::{fit_power_law, PowerLawFit, PowerLawModel};
use crate::spectral::shaper::{shape_model, shape_observed, TaperWindow};

// ---------------------------------------------------------------------------
// ColoredInversion – the linear workflow
// ---------------------------------------------------------------------------

/// One configured inversion.  Holds no data; every call to [`run`](Self::run)
/// is independent and deterministic.
#[derive(Debug, Clone)]
pub struct ColoredInversion {
    config: InversionConfig,
}

/// Every intermediate of a run, in the order it was produced.
#[derive(Debug, Clone)]
pub struct InversionRun {
    /// Trace index used for the seismic spectrum and the QC comparison.
    pub well_trace: usize,
    pub well_spectrum: Spectrum,
    /// The model used for the well; the initial guess when the fit fell back.
    pub well_model: PowerLawModel,
    /// `None` when the fit did not converge and `fallback_to_initial` is set.
    pub well_fit: Option<PowerLawFit>,
    pub seismic_spectrum: Spectrum,
    /// Present for [`SeismicModel::PowerLaw`].
    pub seismic_fit: Option<PowerLawFit>,
    pub well_shaped: Spectrum,
    pub seismic_shaped: Spectrum,
    pub operator: Operator,
    pub inverted: InvertedVolume,
    pub qc: QcReport,
    pub qc_band: (f64, f64),
    /// Mean `|log10|inverted| − log10|well||` over the QC band. Carries the
    /// arbitrary scale of the inverted volume (`n · |seismic|` per bin).
    pub qc_residual: f64,
    /// Same after removing the mean log offset; the headline shape metric.
    pub qc_residual_relative: f64,
}

impl ColoredInversion {
    pub fn new(config: InversionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InversionConfig {
        &self.config
    }

    /// Derive the operator from `well` and the traces around the well, then
    /// invert the whole of `volume`.
    ///
    /// When a horizon window is configured it only limits the spectral
    /// estimation; the operator is applied to the full traces.
    pub fn run(&self, well: &TimeSeries, volume: &SeismicVolume) -> Result<InversionRun> {
        let config = &self.config;
        let well_trace = config.well_trace.unwrap_or(volume.len() / 2);
        if well_trace >= volume.len() {
            return Err(InversionError::invalid_input(format!(
                "well trace {well_trace} out of range for {} traces",
                volume.len()
            )));
        }

        let (well_segment, seismic_segment) = match &config.window {
            Some(window) => (Cow::Owned(well.window(window)?), Cow::Owned(volume.window(window)?)),
            None => (Cow::Borrowed(well), Cow::Borrowed(volume)),
        };

        // Well: estimate and fit.
        let well_spectrum = estimate(&well_segment)?;
        let (f_min, f_max) = config.fit.band;
        let settings = config.fit.settings();
        let (well_model, well_fit) =
            match fit_power_law(&well_spectrum, well_spectrum.band_indices(f_min, f_max), &settings) {
                Ok(fit) => (fit.model, Some(fit)),
                Err(InversionError::FitDidNotConverge { evaluations, cost })
                    if config.fit.fallback_to_initial =>
                {
                    log::warn!(
                        "well fit did not converge ({evaluations} evaluations, cost {cost:.3e}); \
                         using the initial guess A = {}, b = {}",
                        settings.initial.a,
                        settings.initial.b
                    );
                    (settings.initial, None)
                }
                Err(e) => return Err(e),
            };
        log::info!("well model: A = {:.6e}, b = {:.4}", well_model.a, well_model.b);

        // Seismic: local average around the well, optionally modeled.
        let seismic_spectrum = local_spectrum(&seismic_segment, well_trace, config.trace_halfwidth)?;
        config.taper.validate_for(seismic_spectrum.nyquist())?;

        let (seismic_shaped, seismic_fit) = match config.seismic_model {
            SeismicModel::Observed => (shape_observed(&seismic_spectrum, &config.taper)?, None),
            SeismicModel::PowerLaw => {
                let range = seismic_spectrum.band_indices(f_min, f_max);
                let fit = fit_power_law(&seismic_spectrum, range, &settings)?;
                log::info!("seismic model: A = {:.6e}, b = {:.4}", fit.model.a, fit.model.b);
                (shape_model(&fit.model, &seismic_spectrum, &config.taper)?, Some(fit))
            }
        };
        let well_shaped = shape_model(&well_model, &seismic_spectrum, &config.taper)?;

        let operator = derive_operator(&well_shaped, &seismic_shaped)?;
        let inverted = apply_operator(volume, &operator, config.parallel)?;

        let qc = compare_at_well(&inverted, well_trace, &well_spectrum)?;
        let qc_band = config.qc_band();
        let qc_residual = qc.residual(qc_band.0, qc_band.1)?;
        let qc_residual_relative = qc.residual_relative(qc_band.0, qc_band.1)?;
        log::info!(
            "QC at trace {well_trace} over {:.1}..{:.1} Hz: relative residual {qc_residual_relative:.4}, \
             absolute {qc_residual:.4} (log10)",
            qc_band.0,
            qc_band.1
        );

        Ok(InversionRun {
            well_trace,
            well_spectrum,
            well_model,
            well_fit,
            seismic_spectrum,
            seismic_fit,
            well_shaped,
            seismic_shaped,
            operator,
            inverted,
            qc,
            qc_band,
            qc_residual,
            qc_residual_relative,
        })
    }
}

// ---------------------------------------------------------------------------
// RunSummary – serializable QC report
// ---------------------------------------------------------------------------

/// What the CLI writes with `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub well_trace: usize,
    pub well_model: PowerLawModel,
    pub well_fit: Option<PowerLawFit>,
    pub seismic_fit: Option<PowerLawFit>,
    pub taper: TaperWindow,
    pub operator_length: usize,
    pub qc_band: (f64, f64),
    pub qc_residual: f64,
    pub qc_residual_relative: f64,
    pub inverted_frequencies: Vec<f64>,
    pub inverted_magnitudes: Vec<f64>,
    pub well_frequencies: Vec<f64>,
    pub well_magnitudes: Vec<f64>,
}

impl InversionRun {
    pub fn summary(&self, taper: &TaperWindow) -> RunSummary {
        RunSummary {
            well_trace: self.well_trace,
            well_model: self.well_model,
            well_fit: self.well_fit,
            seismic_fit: self.seismic_fit,
            taper: *taper,
            operator_length: self.operator.len(),
            qc_band: self.qc_band,
            qc_residual: self.qc_residual,
            qc_residual_relative: self.qc_residual_relative,
            inverted_frequencies: self.qc.inverted.frequencies().to_vec(),
            inverted_magnitudes: self.qc.inverted.magnitudes(),
            well_frequencies: self.qc.well.frequencies().to_vec(),
            well_magnitudes: self.qc.well.magnitudes(),
        }
    }
}
