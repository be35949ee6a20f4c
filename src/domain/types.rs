//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV/Praat formats
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest accepted search half-width (original command-line range).
pub const MAX_DELTA: f64 = 1000.0;

/// Largest accepted regularization weight (original command-line range).
pub const MAX_WEIGHT: f64 = 1e9;

/// One point of a signal: time in seconds, value in semitones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Time-ordered sequence of samples.
pub type TimeSignal = Vec<Sample>;

/// Target of one segment: the linear trend `slope·t + offset` the filter
/// approaches with time constant `tau` (ms) over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PitchTarget {
    pub slope: f64,
    pub offset: f64,
    pub tau: f64,
    pub duration: f64,
}

impl PitchTarget {
    pub fn new(slope: f64, offset: f64, tau: f64, duration: f64) -> Self {
        Self {
            slope,
            offset,
            tau,
            duration,
        }
    }

    /// Decay rate of the free response in 1/s (`tau` is given in ms).
    pub fn decay_rate(&self) -> f64 {
        1000.0 / self.tau
    }
}

/// Search space and regularization settings.
///
/// The means act both as regularization centres and as centres of the
/// search box `[mean - delta, mean + delta]` of every segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub delta_slope: f64,
    pub delta_offset: f64,
    pub delta_tau: f64,
    pub weight_slope: f64,
    pub weight_offset: f64,
    pub weight_tau: f64,
    pub lambda: f64,
    pub mean_slope: f64,
    pub mean_offset: f64,
    pub mean_tau: f64,
}

impl ParameterSet {
    /// Defaults of the interactive front end; the offset mean is data dependent.
    pub fn with_mean_offset(mean_offset: f64) -> Self {
        Self {
            delta_slope: 50.0,
            delta_offset: 20.0,
            delta_tau: 5.0,
            weight_slope: 10.0,
            weight_offset: 5.0,
            weight_tau: 1.0,
            lambda: 0.0,
            mean_slope: 0.0,
            mean_offset,
            mean_tau: 15.0,
        }
    }

    /// Reject settings that can never produce a meaningful search.
    pub fn validate(&self) -> Result<(), AppError> {
        let deltas = [
            ("slope range", self.delta_slope),
            ("offset range", self.delta_offset),
            ("tau range", self.delta_tau),
        ];
        for (name, value) in deltas {
            if !(value.is_finite() && (0.0..=MAX_DELTA).contains(&value)) {
                return Err(AppError::config(format!(
                    "Invalid {name}: {value} (must be a finite number in [0, {MAX_DELTA}])."
                )));
            }
        }

        let weights = [
            ("slope weight", self.weight_slope),
            ("offset weight", self.weight_offset),
            ("tau weight", self.weight_tau),
            ("lambda", self.lambda),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && (0.0..=MAX_WEIGHT).contains(&value)) {
                return Err(AppError::config(format!(
                    "Invalid {name}: {value} (must be a finite number in [0, {MAX_WEIGHT:e}])."
                )));
            }
        }

        for (name, value) in [
            ("mean slope", self.mean_slope),
            ("mean offset", self.mean_offset),
            ("mean tau", self.mean_tau),
        ] {
            if !value.is_finite() {
                return Err(AppError::config(format!("Invalid {name}: {value}.")));
            }
        }

        let (tau_min, _) = self.tau_bounds();
        if tau_min <= 0.0 {
            return Err(AppError::config(format!(
                "Tau search range reaches {tau_min} ms; mean tau ({}) must exceed the tau range ({}).",
                self.mean_tau, self.delta_tau
            )));
        }

        Ok(())
    }

    pub fn slope_bounds(&self) -> (f64, f64) {
        (self.mean_slope - self.delta_slope, self.mean_slope + self.delta_slope)
    }

    pub fn offset_bounds(&self) -> (f64, f64) {
        (self.mean_offset - self.delta_offset, self.mean_offset + self.delta_offset)
    }

    pub fn tau_bounds(&self) -> (f64, f64) {
        (self.mean_tau - self.delta_tau, self.mean_tau + self.delta_tau)
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Objective value (SSE plus weighted penalty) of the winning restart.
    pub cost: f64,
    pub rmse: f64,
    /// `None` when the correlation is undefined (zero variance).
    pub correlation: Option<f64>,
    pub restarts: usize,
    pub accepted_restarts: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub textgrid_path: PathBuf,
    pub pitch_tier_path: PathBuf,

    pub delta_slope: f64,
    pub delta_offset: f64,
    pub delta_tau: f64,
    pub weight_slope: f64,
    pub weight_offset: f64,
    pub weight_tau: f64,
    pub lambda: f64,
    pub mean_slope: f64,
    /// Offset mean; `None` means "mean of the observed signal".
    pub mean_offset: Option<f64>,
    pub mean_tau: f64,

    /// Restarts on top of the `5 × segments` baseline.
    pub extra_restarts: usize,
    pub seed: u64,
    pub filter_order: usize,
    pub max_evaluations: usize,
    /// Sampling rate (Hz) of the exported fitted contour.
    pub output_rate: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_gesture: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
    pub export_pitch_tier: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl FitConfig {
    /// Resolve the parameter set once the observed signal is known.
    pub fn parameter_set(&self, observed: &[Sample]) -> ParameterSet {
        let mean_offset = self.mean_offset.unwrap_or_else(|| mean_value(observed));
        ParameterSet {
            delta_slope: self.delta_slope,
            delta_offset: self.delta_offset,
            delta_tau: self.delta_tau,
            weight_slope: self.weight_slope,
            weight_offset: self.weight_offset,
            weight_tau: self.weight_tau,
            lambda: self.lambda,
            mean_slope: self.mean_slope,
            mean_offset,
            mean_tau: self.mean_tau,
        }
    }
}

fn mean_value(signal: &[Sample]) -> f64 {
    if signal.is_empty() {
        return f64::NAN;
    }
    signal.iter().map(|s| s.value).sum::<f64>() / signal.len() as f64
}

/// A saved fit report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub created: DateTime<Utc>,
    pub filter_order: usize,
    pub boundaries: Vec<f64>,
    pub onset: Sample,
    pub targets: Vec<PitchTarget>,
    pub parameters: ParameterSet,
    pub quality: FitQuality,
    pub observed: TimeSignal,
    pub fitted: TimeSignal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ParameterSet::with_mean_offset(90.0).validate().is_ok());
    }

    #[test]
    fn negative_weight_is_config_error() {
        let mut ps = ParameterSet::with_mean_offset(90.0);
        ps.weight_offset = -1.0;
        let err = ps.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn tau_box_must_stay_positive() {
        let mut ps = ParameterSet::with_mean_offset(90.0);
        ps.mean_tau = 5.0;
        ps.delta_tau = 5.0;
        assert!(ps.validate().is_err());
    }

    #[test]
    fn nan_lambda_rejected() {
        let mut ps = ParameterSet::with_mean_offset(90.0);
        ps.lambda = f64::NAN;
        assert!(ps.validate().is_err());
    }

    #[test]
    fn bounds_are_centred_on_means() {
        let ps = ParameterSet::with_mean_offset(90.0);
        assert_eq!(ps.slope_bounds(), (-50.0, 50.0));
        assert_eq!(ps.offset_bounds(), (70.0, 110.0));
        assert_eq!(ps.tau_bounds(), (10.0, 20.0));
    }
}
