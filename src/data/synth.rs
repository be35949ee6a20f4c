//! Synthetic F0 contours generated from known targets.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{PitchTarget, Sample, TimeSignal};
use crate::error::{AppError, ErrorKind};
use crate::math::seed::fold_seed;
use crate::models::{CdlpFilter, ContourModel};

/// Everything needed to generate one contour.
#[derive(Debug, Clone)]
pub struct SynthSpec {
    pub boundaries: Vec<f64>,
    pub onset_value: f64,
    pub slopes: Vec<f64>,
    pub offsets: Vec<f64>,
    pub taus: Vec<f64>,
    /// Samples per second.
    pub sample_rate: f64,
    /// Standard deviation of additive Gaussian noise, in semitones.
    pub noise_std: f64,
    pub seed: u64,
    pub filter_order: usize,
}

#[derive(Debug, Clone)]
pub struct SyntheticContour {
    pub boundaries: Vec<f64>,
    pub onset: Sample,
    pub targets: Vec<PitchTarget>,
    pub signal: TimeSignal,
}

pub fn generate_contour(spec: &SynthSpec) -> Result<SyntheticContour, AppError> {
    let segments = spec.boundaries.len().saturating_sub(1);
    for (name, values) in [("slopes", &spec.slopes), ("offsets", &spec.offsets), ("taus", &spec.taus)] {
        if values.len() != segments {
            return Err(AppError::new(
                ErrorKind::ShapeMismatch,
                format!("Got {} {name} for {segments} segments.", values.len()),
            ));
        }
    }
    if let Some(tau) = spec.taus.iter().find(|t| !(**t > 0.0)) {
        return Err(AppError::config(format!("Invalid tau {tau} ms (must be > 0).")));
    }
    if !(spec.sample_rate.is_finite() && spec.sample_rate > 0.0) {
        return Err(AppError::config(format!(
            "Invalid sample rate {} Hz (must be > 0).",
            spec.sample_rate
        )));
    }
    if !(spec.noise_std.is_finite() && spec.noise_std >= 0.0) {
        return Err(AppError::config(format!(
            "Invalid noise level {} st (must be >= 0).",
            spec.noise_std
        )));
    }

    let mut model = ContourModel::from_boundaries(&spec.boundaries, CdlpFilter::new(spec.filter_order)?)?;
    let targets: Vec<PitchTarget> = spec
        .boundaries
        .windows(2)
        .enumerate()
        .map(|(i, w)| PitchTarget::new(spec.slopes[i], spec.offsets[i], spec.taus[i], w[1] - w[0]))
        .collect();
    model.set_onset_value(spec.onset_value);
    model.set_pitch_targets(targets.clone())?;

    let mut signal = model.calculate_f0(1.0 / spec.sample_rate)?;
    if spec.noise_std > 0.0 {
        let mut rng = StdRng::seed_from_u64(noise_seed(spec));
        let normal = Normal::new(0.0, spec.noise_std)
            .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;
        for s in &mut signal {
            s.value += normal.sample(&mut rng);
        }
    }

    Ok(SyntheticContour {
        boundaries: spec.boundaries.clone(),
        onset: model.onset(),
        targets,
        signal,
    })
}

fn noise_seed(spec: &SynthSpec) -> u64 {
    let words = spec.boundaries.iter().chain([&spec.noise_std]).map(|v| v.to_bits());
    fold_seed(spec.seed, words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(noise_std: f64) -> SynthSpec {
        SynthSpec {
            boundaries: vec![0.0, 0.2, 0.5],
            onset_value: 100.0,
            slopes: vec![0.0, 0.0],
            offsets: vec![100.0, 105.0],
            taus: vec![15.0, 15.0],
            sample_rate: 200.0,
            noise_std,
            seed: 42,
            filter_order: 5,
        }
    }

    #[test]
    fn clean_contour_on_uniform_grid() {
        let c = generate_contour(&spec(0.0)).unwrap();
        assert_eq!(c.signal.len(), 101);
        assert_eq!(c.targets[1].duration, 0.3);
        assert!((c.signal[100].value - 105.0).abs() < 1e-3);
    }

    #[test]
    fn noise_is_seeded() {
        let a = generate_contour(&spec(0.5)).unwrap();
        let b = generate_contour(&spec(0.5)).unwrap();
        let clean = generate_contour(&spec(0.0)).unwrap();
        assert_eq!(a.signal, b.signal);
        assert_ne!(a.signal, clean.signal);

        let mut other = spec(0.5);
        other.seed = 7;
        assert_ne!(generate_contour(&other).unwrap().signal, a.signal);
    }

    #[test]
    fn target_lists_must_match_segments() {
        let mut s = spec(0.0);
        s.taus.pop();
        assert_eq!(generate_contour(&s).unwrap_err().kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn non_positive_tau_rejected() {
        let mut s = spec(0.0);
        s.taus[0] = 0.0;
        assert_eq!(generate_contour(&s).unwrap_err().kind(), ErrorKind::Config);
    }
}
