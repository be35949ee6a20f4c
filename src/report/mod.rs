//! Reporting utilities: per-sample residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::Sample;
use crate::models::ContourModel;

/// Observed vs fitted value at one observed sample time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResidual {
    pub time: f64,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Residuals at every observed time the model covers.
pub fn compute_residuals(observed: &[Sample], model: &ContourModel) -> Vec<SampleResidual> {
    let times: Vec<f64> = observed.iter().map(|s| s.time).collect();
    model
        .calculate_f0_at(&times)
        .iter()
        .zip(observed)
        .map(|(m, o)| SampleResidual {
            time: o.time,
            observed: o.value,
            fitted: m.value,
            residual: o.value - m.value,
        })
        .collect()
}

/// The `top_n` residuals of largest magnitude, largest first.
pub fn largest_residuals(residuals: &[SampleResidual], top_n: usize) -> Vec<SampleResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}
