use tam_fit::app::pipeline::{run_fit, run_fit_with_inputs};
use tam_fit::data::{SynthSpec, generate_contour};
use tam_fit::domain::{FitConfig, ParameterSet, PitchTarget, TimeSignal};
use tam_fit::fit::{FitObjective, MultiStartOptimizer, RestartOutcome};
use tam_fit::io::{read_report_json, write_boundary_list, write_pitch_tier};
use tam_fit::models::{CdlpFilter, ContourModel};

const BOUNDARIES: [f64; 3] = [0.0, 0.2, 0.5];

fn scenario_signal() -> TimeSignal {
    let mut model = ContourModel::from_boundaries(&BOUNDARIES, CdlpFilter::default()).unwrap();
    model.set_onset_value(100.0);
    model
        .set_pitch_targets(vec![
            PitchTarget::new(0.0, 100.0, 15.0, 0.2),
            PitchTarget::new(0.0, 105.0, 15.0, 0.3),
        ])
        .unwrap();
    model.calculate_f0(1.0 / 200.0).unwrap()
}

fn wide_parameters(lambda: f64) -> ParameterSet {
    ParameterSet {
        delta_slope: 10.0,
        delta_offset: 10.0,
        delta_tau: 10.0,
        weight_slope: 10.0,
        weight_offset: 5.0,
        weight_tau: 1.0,
        lambda,
        mean_slope: 0.0,
        mean_offset: 102.5,
        mean_tau: 15.0,
    }
}

fn fit_scenario(lambda: f64) -> (FitObjective, tam_fit::fit::MultiStartReport) {
    let mut objective = FitObjective::new(
        scenario_signal(),
        BOUNDARIES.to_vec(),
        wide_parameters(lambda),
        CdlpFilter::default(),
    )
    .unwrap();
    let report = MultiStartOptimizer::new(0, 42).optimize(&mut objective).unwrap();
    (objective, report)
}

#[test]
fn two_segment_scenario_recovers_offsets() {
    let (objective, report) = fit_scenario(0.0);
    assert_eq!(report.restarts(), 10);

    let targets = objective.optimum().unwrap().targets();
    assert!((targets[0].offset - 100.0).abs() < 0.5, "offset 1 = {}", targets[0].offset);
    assert!((targets[1].offset - 105.0).abs() < 0.5, "offset 2 = {}", targets[1].offset);
    assert!(objective.root_mean_square_error().unwrap() < 0.1);
}

#[test]
fn exact_signal_round_trips() {
    let (objective, _) = fit_scenario(0.0);
    let rmse = objective.root_mean_square_error().unwrap();
    assert!(rmse < 1e-3, "rmse = {rmse}");
    assert!(objective.correlation_coefficient().unwrap() > 0.999);
}

#[test]
fn accepted_restarts_respect_bounds() {
    let (_, report) = fit_scenario(0.0);
    let accepted: Vec<&RestartOutcome> = report.outcomes.iter().filter(|o| o.is_accepted()).collect();
    assert!(!accepted.is_empty());
    for outcome in accepted {
        if let RestartOutcome::Accepted { x, cost, .. } = outcome {
            assert!(report.bounds.contains(x), "restart left the box: {x:?}");
            assert!(*cost > 0.0);
        }
    }
}

#[test]
fn stronger_regularization_pulls_targets_to_means() {
    let (free, _) = fit_scenario(0.0);
    let (tied, _) = fit_scenario(100.0);

    let free_penalty = free.penalty(free.optimum().unwrap().targets());
    let tied_penalty = tied.penalty(tied.optimum().unwrap().targets());
    assert!(
        tied_penalty < free_penalty,
        "penalty did not shrink: {tied_penalty} vs {free_penalty}"
    );
}

#[test]
fn same_seed_same_answer() {
    let (_, a) = fit_scenario(0.0);
    let (_, b) = fit_scenario(0.0);
    assert_eq!(a.best_index, b.best_index);
    assert_eq!(a.best_x, b.best_x);
}

fn file_config(dir: &std::path::Path) -> FitConfig {
    FitConfig {
        textgrid_path: dir.join("bounds.txt"),
        pitch_tier_path: dir.join("input.PitchTier"),
        delta_slope: 10.0,
        delta_offset: 10.0,
        delta_tau: 10.0,
        weight_slope: 10.0,
        weight_offset: 5.0,
        weight_tau: 1.0,
        lambda: 0.0,
        mean_slope: 0.0,
        mean_offset: None,
        mean_tau: 15.0,
        extra_restarts: 2,
        seed: 7,
        filter_order: 5,
        max_evaluations: 1_000_000,
        output_rate: 200.0,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        export_gesture: Some(dir.join("out.ges")),
        export_csv: Some(dir.join("out.csv")),
        export_pitch_tier: Some(dir.join("out.PitchTier")),
        export_json: Some(dir.join("out.json")),
    }
}

#[test]
fn synthetic_files_fit_end_to_end() {
    let dir = std::env::temp_dir().join(format!("tam-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let contour = generate_contour(&SynthSpec {
        boundaries: vec![0.05, 0.3, 0.55],
        onset_value: 95.0,
        slopes: vec![5.0, -5.0],
        offsets: vec![98.0, 94.0],
        taus: vec![12.0, 18.0],
        sample_rate: 100.0,
        noise_std: 0.0,
        seed: 3,
        filter_order: 5,
    })
    .unwrap();

    let config = file_config(&dir);
    write_boundary_list(&config.textgrid_path, &contour.boundaries).unwrap();
    write_pitch_tier(&config.pitch_tier_path, &contour.signal).unwrap();

    let run = run_fit(&config).unwrap();
    assert_eq!(run.targets.len(), 2);
    assert!(run.quality.rmse < 0.05, "rmse = {}", run.quality.rmse);
    assert_eq!(run.onset.time, 0.05);

    // The report is written by the front end; emulate it.
    tam_fit::io::write_report_json(
        config.export_json.as_deref().unwrap(),
        &tam_fit::app::pipeline::build_report(&run),
    )
    .unwrap();
    let report = read_report_json(config.export_json.as_deref().unwrap()).unwrap();
    assert_eq!(report.boundaries, run.boundaries);
    assert_eq!(report.fitted.len(), run.fitted.len());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn empty_observation_fails_before_search() {
    let dir = std::env::temp_dir();
    let err = run_fit_with_inputs(&file_config(&dir), BOUNDARIES.to_vec(), Vec::new()).unwrap_err();
    assert_eq!(err.kind(), tam_fit::error::ErrorKind::Config);
}
