use approx::assert_relative_eq;

use colored_inversion::spectral::estimator::estimate;
use colored_inversion::synthetic::{band_limited_wavelet, power_law_series, SyntheticSurvey};
use colored_inversion::{
    ColoredInversion, InversionConfig, InversionError, SeismicModel, SeismicVolume, TaperWindow,
    TimeSeries,
};

const N: usize = 200;
const DT: f64 = 0.001;
const WELL_TRACE: usize = 25;

/// 1000/f well log around an impedance of 5000.
fn well_log() -> TimeSeries {
    let values = power_law_series(N, DT, 1000.0, -1.0, 11)
        .unwrap()
        .into_iter()
        .map(|v| 5000.0 + v)
        .collect();
    TimeSeries::uniform(0.0, DT, values).unwrap()
}

/// Flat 5-100 Hz wavelet scaled so that `n · |W| = 1` in the band.
fn wavelet() -> Vec<f64> {
    let band = TaperWindow::new(2.0, 4.0, 100.0, 150.0).unwrap();
    band_limited_wavelet(N, DT, &band, 1.0 / N as f64).unwrap()
}

fn survey() -> SeismicVolume {
    SyntheticSurvey {
        n_traces: 50,
        n_samples: N,
        dt: DT,
        anchor_trace: WELL_TRACE,
        dip: 0.5,
        background: 0.0,
        seed: 3,
    }
    .volume(&wavelet())
    .unwrap()
}

fn config() -> InversionConfig {
    InversionConfig {
        well_trace: Some(WELL_TRACE),
        ..InversionConfig::default()
    }
}

#[test]
fn recovers_well_spectrum_at_the_well() {
    let run = ColoredInversion::new(config()).unwrap().run(&well_log(), &survey()).unwrap();

    let fit = run.well_fit.expect("well fit converged");
    assert_relative_eq!(fit.model.a, 1000.0, max_relative = 1e-6);
    assert_relative_eq!(fit.model.b, -1.0, max_relative = 1e-6);

    assert_eq!(run.well_trace, WELL_TRACE);
    assert_eq!(run.operator.len(), N);
    assert_eq!(run.inverted.len(), 50);
    assert_eq!(run.inverted.n_samples(), N);
    assert_eq!(run.qc_band, (10.0, 60.0));
    assert!(run.qc_residual < 0.5, "QC residual {}", run.qc_residual);

    // Operator spectrum times the wavelet spectrum restores the well model in the passband.
    let operator = estimate(&TimeSeries::uniform(0.0, DT, run.operator.coefficients().to_vec()).unwrap())
        .unwrap()
        .magnitudes();
    let wavelet = estimate(&TimeSeries::uniform(0.0, DT, wavelet()).unwrap())
        .unwrap()
        .magnitudes();
    let frequencies = run.seismic_spectrum.frequencies();
    for k in run.seismic_spectrum.band_indices(10.0, 60.0) {
        let restored = operator[k] * wavelet[k] * N as f64;
        assert_relative_eq!(restored, 1000.0 / frequencies[k], max_relative = 1e-3);
    }
}

#[test]
fn operator_matches_spectral_gap() {
    let run = ColoredInversion::new(config()).unwrap().run(&well_log(), &survey()).unwrap();
    let operator = estimate(&TimeSeries::uniform(0.0, DT, run.operator.coefficients().to_vec()).unwrap())
        .unwrap()
        .magnitudes();
    let well = run.well_shaped.magnitudes();
    let seismic = run.seismic_shaped.magnitudes();
    for k in 1..operator.len() {
        assert!(
            (operator[k] - (well[k] - seismic[k]).abs()).abs() < 1e-9,
            "bin {k}: {} vs {}",
            operator[k],
            (well[k] - seismic[k]).abs()
        );
    }
    // Taper is zero outside 5..80 Hz.
    assert_eq!(well[0], 0.0);
    assert_eq!(well[frequencies_index(&run.well_shaped, 90.0)], 0.0);
}

fn frequencies_index(spectrum: &colored_inversion::Spectrum, f: f64) -> usize {
    spectrum.frequencies().partition_point(|&x| x < f)
}

#[test]
fn rerun_is_identical() {
    let inversion = ColoredInversion::new(config()).unwrap();
    let (well, volume) = (well_log(), survey());
    let first = inversion.run(&well, &volume).unwrap();
    let second = inversion.run(&well, &volume).unwrap();
    assert_eq!(first.inverted, second.inverted);
    assert_eq!(first.operator, second.operator);

    let sequential = ColoredInversion::new(InversionConfig { parallel: false, ..config() })
        .unwrap()
        .run(&well, &volume)
        .unwrap();
    assert_eq!(first.inverted, sequential.inverted);
}

#[test]
fn power_law_seismic_model() {
    let config = InversionConfig {
        seismic_model: SeismicModel::PowerLaw,
        ..config()
    };
    let run = ColoredInversion::new(config).unwrap().run(&well_log(), &survey()).unwrap();
    let fit = run.seismic_fit.expect("seismic fit present");
    assert_relative_eq!(fit.model.a, 1.0 / N as f64, max_relative = 1e-6);
    assert!(fit.model.b.abs() < 1e-6, "b = {}", fit.model.b);
    assert!(run.qc_residual < 0.5, "QC residual {}", run.qc_residual);
}

#[test]
fn trace_neighbourhood_and_window_are_honoured() {
    let config = InversionConfig {
        trace_halfwidth: 3,
        window: Some(colored_inversion::TimeWindow { start: 0.0, end: 0.1505 }),
        ..config()
    };
    let run = ColoredInversion::new(config).unwrap().run(&well_log(), &survey()).unwrap();
    // 151 samples inside the window; the full traces are still inverted.
    assert_eq!(run.seismic_spectrum.n_samples(), 151);
    assert_eq!(run.operator.len(), 151);
    assert_eq!(run.inverted.n_samples(), N);
}

#[test]
fn stage_errors_abort_the_run() {
    let (well, volume) = (well_log(), survey());

    let above_nyquist = InversionConfig {
        taper: TaperWindow::new(5.0, 10.0, 60.0, 600.0).unwrap(),
        ..config()
    };
    let err = ColoredInversion::new(above_nyquist).unwrap().run(&well, &volume).unwrap_err();
    assert!(matches!(err, InversionError::ConfigurationError(_)), "{err:?}");

    let out_of_range = InversionConfig { well_trace: Some(50), ..config() };
    let err = ColoredInversion::new(out_of_range).unwrap().run(&well, &volume).unwrap_err();
    assert!(matches!(err, InversionError::InvalidInput(_)), "{err:?}");

    let bad_taper = InversionConfig {
        taper: TaperWindow { lo_start: 10.0, lo_end: 5.0, hi_start: 60.0, hi_end: 80.0 },
        ..config()
    };
    assert!(matches!(ColoredInversion::new(bad_taper), Err(InversionError::ConfigurationError(_))));
}

#[test]
fn unconverged_well_fit_falls_back_only_when_asked() {
    let (well, volume) = (well_log(), survey());
    let mut config = config();
    config.fit.max_evaluations = 1;

    let err = ColoredInversion::new(config.clone()).unwrap().run(&well, &volume).unwrap_err();
    assert!(matches!(err, InversionError::FitDidNotConverge { evaluations: 1, .. }), "{err:?}");

    config.fit.fallback_to_initial = true;
    let run = ColoredInversion::new(config.clone()).unwrap().run(&well, &volume).unwrap();
    assert!(run.well_fit.is_none());
    assert_eq!(run.well_model, config.fit.initial);
}

#[test]
fn summary_carries_both_spectra() {
    let config = config();
    let taper = config.taper;
    let run = ColoredInversion::new(config).unwrap().run(&well_log(), &survey()).unwrap();
    let summary = run.summary(&taper);
    assert_eq!(summary.operator_length, N);
    assert_eq!(summary.inverted_magnitudes.len(), N / 2);
    assert_eq!(summary.well_magnitudes.len(), N / 2);
    assert_eq!(summary.qc_residual, run.qc_residual);
    assert_eq!(summary.qc_residual_relative, run.qc_residual_relative);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["well_trace"], WELL_TRACE);
}

#[test]
fn relative_residual_holds_at_field_amplitudes() {
    // Unit-gain wavelet with background reflectivity, as written by `generate_sample`.
    const N_FIELD: usize = 500;
    const DT_FIELD: f64 = 0.002;
    let values = power_law_series(N_FIELD, DT_FIELD, 400.0, -1.0, 42)
        .unwrap()
        .into_iter()
        .map(|v| 6500.0 + v)
        .collect();
    let well = TimeSeries::uniform(0.0, DT_FIELD, values).unwrap();
    let band = TaperWindow::new(4.0, 8.0, 60.0, 70.0).unwrap();
    let wavelet = band_limited_wavelet(N_FIELD, DT_FIELD, &band, 1.0).unwrap();
    let volume = SyntheticSurvey {
        n_traces: 101,
        n_samples: N_FIELD,
        dt: DT_FIELD,
        anchor_trace: 50,
        dip: 0.6,
        background: 0.3,
        seed: 7,
    }
    .volume(&wavelet)
    .unwrap();

    let run = ColoredInversion::new(InversionConfig::default())
        .unwrap()
        .run(&well, &volume)
        .unwrap();
    assert_eq!(run.well_trace, 50);
    assert!(
        run.qc_residual_relative < 0.5,
        "relative QC residual {} (absolute {})",
        run.qc_residual_relative,
        run.qc_residual
    );
}
