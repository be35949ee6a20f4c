//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! read inputs -> build objective -> multi-start search -> diagnostics -> residuals
//!
//! Front-ends then only deal with presentation (printing, plotting, exports).

use chrono::Utc;
use log::{info, warn};

use crate::domain::{FitConfig, FitQuality, FitReportFile, ParameterSet, PitchTarget, Sample, TimeSignal};
use crate::error::{AppError, ErrorKind};
use crate::fit::{FitObjective, MultiStartOptimizer, MultiStartReport};
use crate::io::{read_pitch_tier, read_textgrid};
use crate::models::CdlpFilter;
use crate::report::{SampleResidual, compute_residuals};

/// All computed outputs of a single `tam fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub boundaries: Vec<f64>,
    pub observed: TimeSignal,
    pub parameters: ParameterSet,
    pub filter_order: usize,
    pub onset: Sample,
    pub targets: Vec<PitchTarget>,
    pub fitted: TimeSignal,
    pub quality: FitQuality,
    pub residuals: Vec<SampleResidual>,
    pub search: MultiStartReport,
}

/// Read the configured input files and run the fit.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let boundaries = read_textgrid(&config.textgrid_path)?;
    let observed = read_pitch_tier(&config.pitch_tier_path)?;
    info!(
        "Read {} boundaries from '{}' and {} samples from '{}'",
        boundaries.len(),
        config.textgrid_path.display(),
        observed.len(),
        config.pitch_tier_path.display()
    );
    run_fit_with_inputs(config, boundaries, observed)
}

/// Run the fit on in-memory inputs.
pub fn run_fit_with_inputs(
    config: &FitConfig,
    boundaries: Vec<f64>,
    observed: TimeSignal,
) -> Result<RunOutput, AppError> {
    if !(config.output_rate.is_finite() && config.output_rate > 0.0) {
        return Err(AppError::config(format!(
            "Invalid output rate {} Hz (must be > 0).",
            config.output_rate
        )));
    }
    let filter = CdlpFilter::new(config.filter_order)?;
    let parameters = config.parameter_set(&observed);
    let mut objective = FitObjective::new(observed, boundaries, parameters, filter)?;

    let optimizer = MultiStartOptimizer::new(config.extra_restarts, config.seed)
        .with_max_evaluations(config.max_evaluations);
    let search = optimizer.optimize(&mut objective)?;

    let rmse = objective.root_mean_square_error()?;
    let correlation = match objective.correlation_coefficient() {
        Ok(c) => Some(c),
        Err(err) if err.kind() == ErrorKind::DegenerateStatistics => {
            warn!("Correlation undefined: {err}");
            None
        }
        Err(err) => return Err(err),
    };

    let fitted = objective.fitted_signal(1.0 / config.output_rate)?;
    let Some(model) = objective.optimum() else {
        return Err(AppError::new(ErrorKind::Convergence, "Optimizer stored no optimum."));
    };
    let residuals = compute_residuals(objective.observed(), model);

    let quality = FitQuality {
        cost: search.best_cost,
        rmse,
        correlation,
        restarts: search.restarts(),
        accepted_restarts: search.accepted_count(),
    };

    Ok(RunOutput {
        boundaries: objective.boundaries().to_vec(),
        observed: objective.observed().to_vec(),
        parameters,
        filter_order: filter.order(),
        onset: model.onset(),
        targets: model.targets().to_vec(),
        fitted,
        quality,
        residuals,
        search,
    })
}

/// Portable JSON record of a run.
pub fn build_report(run: &RunOutput) -> FitReportFile {
    FitReportFile {
        tool: "tam".to_string(),
        created: Utc::now(),
        filter_order: run.filter_order,
        boundaries: run.boundaries.clone(),
        onset: run.onset,
        targets: run.targets.clone(),
        parameters: run.parameters,
        quality: run.quality.clone(),
        observed: run.observed.clone(),
        fitted: run.fitted.clone(),
    }
}
