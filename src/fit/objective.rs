//! Regularized least-squares objective over a flat parameter vector.
//!
//! Parameter layout:
//!
//! ```text
//! [onset, slope_1, offset_1, tau_1, slope_2, offset_2, tau_2, …]   (length 3·segments + 1)
//! ```
//!
//! Segment durations never come from the vector; they are fixed by the
//! boundary sequence the objective was built with.

use crate::domain::{ParameterSet, PitchTarget, Sample, TimeSignal};
use crate::error::{AppError, ErrorKind};
use crate::math::{correlation_coefficient, root_mean_square_error};
use crate::models::{CdlpFilter, ContourModel};

/// Parameters per segment: slope, offset, tau.
pub const PARAMS_PER_SEGMENT: usize = 3;

#[derive(Debug, Clone)]
pub struct FitObjective {
    observed: TimeSignal,
    times: Vec<f64>,
    parameters: ParameterSet,
    boundaries: Vec<f64>,
    skeleton: ContourModel,
    optimum: Option<ContourModel>,
}

impl FitObjective {
    pub fn new(
        observed: TimeSignal,
        boundaries: Vec<f64>,
        parameters: ParameterSet,
        filter: CdlpFilter,
    ) -> Result<Self, AppError> {
        if observed.is_empty() {
            return Err(AppError::config("Observed pitch signal is empty; nothing to fit."));
        }
        if let Some(s) = observed.iter().find(|s| !(s.time.is_finite() && s.value.is_finite())) {
            return Err(AppError::config(format!(
                "Observed pitch signal contains a non-finite sample ({}, {}).",
                s.time, s.value
            )));
        }
        if observed.windows(2).any(|w| w[1].time < w[0].time) {
            return Err(AppError::config("Observed pitch signal is not ordered by time."));
        }
        parameters.validate()?;
        let skeleton = ContourModel::from_boundaries(&boundaries, filter)?;

        let times = observed.iter().map(|s| s.time).collect();
        Ok(Self {
            observed,
            times,
            parameters,
            boundaries,
            skeleton,
            optimum: None,
        })
    }

    /// Length of the parameter vector.
    pub fn dimension(&self) -> usize {
        PARAMS_PER_SEGMENT * self.segment_count() + 1
    }

    pub fn segment_count(&self) -> usize {
        self.skeleton.segment_count()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn observed(&self) -> &[Sample] {
        &self.observed
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn filter(&self) -> CdlpFilter {
        self.skeleton.filter()
    }

    /// Flatten an onset value and targets into the parameter layout.
    pub fn encode(onset_value: f64, targets: &[PitchTarget]) -> Vec<f64> {
        let mut out = Vec::with_capacity(PARAMS_PER_SEGMENT * targets.len() + 1);
        out.push(onset_value);
        for t in targets {
            out.extend_from_slice(&[t.slope, t.offset, t.tau]);
        }
        out
    }

    /// Split a parameter vector into the onset value and per-segment targets.
    pub fn decode(&self, params: &[f64]) -> Result<(f64, Vec<PitchTarget>), AppError> {
        if params.len() != self.dimension() {
            return Err(AppError::new(
                ErrorKind::ShapeMismatch,
                format!(
                    "Parameter vector has length {}, expected {} for {} segments.",
                    params.len(),
                    self.dimension(),
                    self.segment_count()
                ),
            ));
        }
        Ok((params[0], self.targets_from(&params[1..])))
    }

    fn targets_from(&self, segment_params: &[f64]) -> Vec<PitchTarget> {
        segment_params
            .chunks_exact(PARAMS_PER_SEGMENT)
            .zip(self.skeleton.targets())
            .map(|(p, skel)| PitchTarget::new(p[0], p[1], p[2], skel.duration))
            .collect()
    }

    /// Fresh model for a parameter vector.
    pub fn model_for(&self, params: &[f64]) -> Result<ContourModel, AppError> {
        let (onset_value, targets) = self.decode(params)?;
        let mut model = self.skeleton.clone();
        model.set_onset_value(onset_value);
        model.set_pitch_targets(targets)?;
        Ok(model)
    }

    /// Cost of a parameter vector: SSE against the observation plus `lambda · penalty`.
    ///
    /// Pure in `params`; a non-finite cost is reported as `+∞`.
    ///
    /// # Panics
    /// Panics if `params.len() != self.dimension()`.
    pub fn evaluate(&self, params: &[f64]) -> f64 {
        assert_eq!(
            params.len(),
            self.dimension(),
            "parameter vector length must be 3·segments + 1"
        );
        let onset = Sample::new(self.boundaries[0], params[0]);
        let targets = self.targets_from(&params[1..]);
        let modeled = self.skeleton.filter().response_with_ends(
            onset,
            &targets,
            &self.boundaries[1..],
            &self.times,
        );
        let cost = self.squared_error(&modeled) + self.parameters.lambda * self.penalty(&targets);
        if cost.is_finite() { cost } else { f64::INFINITY }
    }

    /// Squared error of `model` at the observed sample times.
    pub fn sum_squared_error(&self, model: &ContourModel) -> f64 {
        self.squared_error(&model.calculate_f0_at(&self.times))
    }

    fn squared_error(&self, modeled: &[Sample]) -> f64 {
        modeled
            .iter()
            .zip(&self.observed)
            .map(|(m, o)| (o.value - m.value).powi(2))
            .sum()
    }

    /// Unscaled regularization term: weighted squared distance of every target to the means.
    pub fn penalty(&self, targets: &[PitchTarget]) -> f64 {
        let p = &self.parameters;
        targets
            .iter()
            .map(|t| {
                p.weight_slope * (t.slope - p.mean_slope).powi(2)
                    + p.weight_offset * (t.offset - p.mean_offset).powi(2)
                    + p.weight_tau * (t.tau - p.mean_tau).powi(2)
            })
            .sum()
    }

    /// Store the winning onset value and targets.
    pub fn set_optimum(&mut self, onset_value: f64, targets: Vec<PitchTarget>) -> Result<(), AppError> {
        let mut model = self.skeleton.clone();
        model.set_onset_value(onset_value);
        model.set_pitch_targets(targets)?;
        self.optimum = Some(model);
        Ok(())
    }

    pub fn optimum(&self) -> Option<&ContourModel> {
        self.optimum.as_ref()
    }

    /// Fitted contour resampled on a uniform grid.
    pub fn fitted_signal(&self, sampling_period: f64) -> Result<TimeSignal, AppError> {
        self.require_optimum()?.calculate_f0(sampling_period)
    }

    pub fn root_mean_square_error(&self) -> Result<f64, AppError> {
        let (observed, modeled) = self.paired_values()?;
        root_mean_square_error(&observed, &modeled)
    }

    pub fn correlation_coefficient(&self) -> Result<f64, AppError> {
        let (observed, modeled) = self.paired_values()?;
        correlation_coefficient(&observed, &modeled)
    }

    fn require_optimum(&self) -> Result<&ContourModel, AppError> {
        self.optimum.as_ref().ok_or_else(|| {
            AppError::new(
                ErrorKind::Convergence,
                "No optimum has been stored; run the optimizer first.",
            )
        })
    }

    /// Observed and optimal-model values at the observed times that the model covers.
    fn paired_values(&self) -> Result<(Vec<f64>, Vec<f64>), AppError> {
        let model = self.require_optimum()?.calculate_f0_at(&self.times);
        let observed = self.observed.iter().take(model.len()).map(|s| s.value).collect();
        let modeled = model.iter().map(|s| s.value).collect();
        Ok((observed, modeled))
    }
}
