/// Frequency-domain stages: estimation, power-law fitting, band-limiting.
pub mod estimator;
pub mod fitter;
pub mod shaper;
