//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! concerns and output changes stay local.

use crate::domain::{FitQuality, ParameterSet, PitchTarget, Sample};
use crate::report::SampleResidual;

/// Format the run summary: inputs, search settings, fitted targets, diagnostics.
pub fn format_run_summary(
    boundaries: &[f64],
    observed_len: usize,
    parameters: &ParameterSet,
    onset: Sample,
    targets: &[PitchTarget],
    quality: &FitQuality,
) -> String {
    let mut out = String::new();

    out.push_str("=== tam - Target Approximation Model fit ===\n");
    out.push_str(&format!(
        "Segments: {} | boundaries={}\n",
        targets.len(),
        fmt_vec(boundaries)
    ));
    out.push_str(&format!("Observed samples: {observed_len}\n"));
    out.push_str(&format!(
        "Search: slope {:.2} +/- {:.2} st/s | offset {:.2} +/- {:.2} st | tau {:.2} +/- {:.2} ms\n",
        parameters.mean_slope,
        parameters.delta_slope,
        parameters.mean_offset,
        parameters.delta_offset,
        parameters.mean_tau,
        parameters.delta_tau
    ));
    out.push_str(&format!(
        "Regularization: lambda={} | weights slope={} offset={} tau={}\n",
        parameters.lambda, parameters.weight_slope, parameters.weight_offset, parameters.weight_tau
    ));
    out.push_str(&format!(
        "Restarts: {} accepted of {}\n",
        quality.accepted_restarts, quality.restarts
    ));

    out.push_str("\nOptimization successful!\n");
    out.push_str(&format!("Onset: t={:.4}s value={:.4}st\n", onset.time, onset.value));
    out.push_str(&format_targets(targets));
    out.push('\n');
    out.push_str(&format!("Cost = {:.6e}\n", quality.cost));
    out.push_str(&format!("RMSE = {:.6}\n", quality.rmse));
    out.push_str(&format!("CORR = {}\n", fmt_correlation(quality.correlation)));

    out
}

/// Table of fitted targets.
pub fn format_targets(targets: &[PitchTarget]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4} {:>12} {:>12} {:>10} {:>10}\n",
        "#", "slope", "offset", "tau", "duration"
    ));
    out.push_str(&format!(
        "{:->4} {:->12} {:->12} {:->10} {:->10}\n",
        "", "", "", "", ""
    ));
    for (i, t) in targets.iter().enumerate() {
        out.push_str(&format!(
            "{:>4} {:>12.4} {:>12.4} {:>10.4} {:>10.4}\n",
            i + 1,
            t.slope,
            t.offset,
            t.tau,
            t.duration
        ));
    }
    out
}

/// Largest residuals, one per line.
pub fn format_residuals(rows: &[SampleResidual]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals:\n");
    out.push_str(&format!(
        "{:>10} {:>12} {:>12} {:>10}\n",
        "time", "observed", "fitted", "residual"
    ));
    for r in rows {
        out.push_str(&format!(
            "{:>10.4} {:>12.4} {:>12.4} {:>10.4}\n",
            r.time, r.observed, r.fitted, r.residual
        ));
    }
    out
}

fn fmt_correlation(c: Option<f64>) -> String {
    c.map(|v| format!("{v:.6}")).unwrap_or_else(|| "n/a (zero variance)".to_string())
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    format!("[{}]", parts.join(", "))
}
