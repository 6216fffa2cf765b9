//! Colored inversion of seismic reflectivity to relative acoustic impedance.
//!
//! A spectral-shaping operator is derived from the power-law spectrum of a
//! well log and the local seismic spectrum, rotated by 90° and convolved with
//! every trace. See [`pipeline::ColoredInversion`] for the whole workflow.

pub mod config;
pub mod convolve;
pub mod data;
pub mod error;
pub mod operator;
pub mod pipeline;
pub mod qc;
pub mod spectral;
pub mod synthetic;

pub use config::{FitConfig, InversionConfig, SeismicModel};
pub use data::model::{InvertedVolume, SeismicVolume, TimeSeries};
pub use data::window::TimeWindow;
pub use error::{InversionError, Result};
pub use operator::Operator;
pub use pipeline::{ColoredInversion, InversionRun, RunSummary};
pub use spectral::estimator::Spectrum;
pub use spectral::fitter::{PowerLawFit, PowerLawModel};
pub use spectral::shaper::TaperWindow;
