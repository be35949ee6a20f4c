//! Fit diagnostics: root-mean-square error and Pearson correlation.
//!
//! Both functions refuse to produce NaN: empty inputs and zero-variance
//! series are reported as `DegenerateStatistics` errors.

use nalgebra::DVector;

use crate::error::{AppError, ErrorKind};

/// Relative variance floor below which a series counts as constant.
const VARIANCE_EPS: f64 = 1e-24;

/// Root-mean-square difference of two equally long series.
pub fn root_mean_square_error(observed: &[f64], modeled: &[f64]) -> Result<f64, AppError> {
    check_pair(observed, modeled)?;
    let diff = DVector::from_column_slice(modeled) - DVector::from_column_slice(observed);
    Ok((diff.norm_squared() / diff.len() as f64).sqrt())
}

/// Pearson correlation coefficient of two equally long series.
pub fn correlation_coefficient(observed: &[f64], modeled: &[f64]) -> Result<f64, AppError> {
    check_pair(observed, modeled)?;
    let x = centred(observed);
    let y = centred(modeled);

    let sxx = x.norm_squared();
    let syy = y.norm_squared();
    if sxx <= VARIANCE_EPS * (1.0 + mean_square(observed)) * x.len() as f64 {
        return Err(AppError::new(
            ErrorKind::DegenerateStatistics,
            "Correlation is undefined: the observed signal has zero variance.",
        ));
    }
    if syy <= VARIANCE_EPS * (1.0 + mean_square(modeled)) * y.len() as f64 {
        return Err(AppError::new(
            ErrorKind::DegenerateStatistics,
            "Correlation is undefined: the modeled signal has zero variance.",
        ));
    }

    Ok(x.dot(&y) / (sxx.sqrt() * syy.sqrt()))
}

fn check_pair(a: &[f64], b: &[f64]) -> Result<(), AppError> {
    if a.len() != b.len() {
        return Err(AppError::new(
            ErrorKind::ShapeMismatch,
            format!("Series lengths differ: {} vs {}.", a.len(), b.len()),
        ));
    }
    if a.is_empty() {
        return Err(AppError::new(
            ErrorKind::DegenerateStatistics,
            "Statistics are undefined for empty series.",
        ));
    }
    Ok(())
}

fn centred(values: &[f64]) -> DVector<f64> {
    let v = DVector::from_column_slice(values);
    let mean = v.mean();
    v.map(|x| x - mean)
}

fn mean_square(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}
