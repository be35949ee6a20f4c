//! Parametric F0 contour: an onset sample followed by one target per segment.

use crate::domain::{PitchTarget, Sample, TimeSignal};
use crate::error::{AppError, ErrorKind};
use crate::models::filter::CdlpFilter;

/// Check that boundary times are usable as a segmentation.
pub fn validate_boundaries(boundaries: &[f64]) -> Result<(), AppError> {
    if boundaries.len() < 2 {
        return Err(AppError::config(format!(
            "Need at least two boundaries (one segment), got {}.",
            boundaries.len()
        )));
    }
    if let Some(bad) = boundaries.iter().find(|b| !b.is_finite()) {
        return Err(AppError::config(format!("Non-finite boundary time: {bad}.")));
    }
    if let Some(w) = boundaries.windows(2).find(|w| w[1] <= w[0]) {
        return Err(AppError::config(format!(
            "Boundaries must be strictly increasing ({} is followed by {}).",
            w[0], w[1]
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContourModel {
    boundaries: Vec<f64>,
    onset: Sample,
    targets: Vec<PitchTarget>,
    filter: CdlpFilter,
}

impl ContourModel {
    /// Build a skeleton from boundary times: durations are fixed, targets zeroed.
    pub fn from_boundaries(boundaries: &[f64], filter: CdlpFilter) -> Result<Self, AppError> {
        validate_boundaries(boundaries)?;
        let targets = boundaries
            .windows(2)
            .map(|w| PitchTarget::new(0.0, 0.0, 0.0, w[1] - w[0]))
            .collect();
        Ok(Self {
            boundaries: boundaries.to_vec(),
            onset: Sample::new(boundaries[0], 0.0),
            targets,
            filter,
        })
    }

    pub fn onset(&self) -> Sample {
        self.onset
    }

    pub fn targets(&self) -> &[PitchTarget] {
        &self.targets
    }

    pub fn filter(&self) -> CdlpFilter {
        self.filter
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn segment_count(&self) -> usize {
        self.targets.len()
    }

    pub fn total_duration(&self) -> f64 {
        self.end_time() - self.onset.time
    }

    /// The last boundary, as given at construction.
    pub fn end_time(&self) -> f64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    pub fn set_onset_value(&mut self, value: f64) {
        self.onset.value = value;
    }

    /// Replace all targets; the count must match the segmentation.
    pub fn set_pitch_targets(&mut self, targets: Vec<PitchTarget>) -> Result<(), AppError> {
        if targets.len() != self.targets.len() {
            return Err(AppError::new(
                ErrorKind::ShapeMismatch,
                format!(
                    "Got {} targets for {} segments.",
                    targets.len(),
                    self.targets.len()
                ),
            ));
        }
        self.targets = targets;
        Ok(())
    }

    /// Uniform grid from the onset to the last boundary (inclusive).
    pub fn sample_times(&self, sampling_period: f64) -> Result<Vec<f64>, AppError> {
        if !(sampling_period.is_finite() && sampling_period > 0.0) {
            return Err(AppError::config(format!(
                "Invalid sampling period: {sampling_period} (must be finite and > 0)."
            )));
        }
        let start = self.onset.time;
        let end = self.end_time();
        // The epsilon absorbs representation error in `total / period`.
        let count = ((end - start) / sampling_period + 1e-9).floor() as usize + 1;
        Ok((0..count)
            .map(|k| (start + k as f64 * sampling_period).min(end))
            .collect())
    }

    /// Contour on a uniform grid with the given sampling period (seconds).
    pub fn calculate_f0(&self, sampling_period: f64) -> Result<TimeSignal, AppError> {
        let times = self.sample_times(sampling_period)?;
        Ok(self.calculate_f0_at(&times))
    }

    /// Contour at caller-supplied, non-decreasing times.
    pub fn calculate_f0_at(&self, times: &[f64]) -> TimeSignal {
        self.filter
            .response_with_ends(self.onset, &self.targets, &self.boundaries[1..], times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_segment_model() -> ContourModel {
        let mut model = ContourModel::from_boundaries(&[0.0, 0.2, 0.5], CdlpFilter::default()).unwrap();
        model.set_onset_value(100.0);
        model
            .set_pitch_targets(vec![
                PitchTarget::new(0.0, 100.0, 15.0, 0.2),
                PitchTarget::new(0.0, 105.0, 15.0, 0.3),
            ])
            .unwrap();
        model
    }

    #[test]
    fn skeleton_fixes_durations() {
        let model = ContourModel::from_boundaries(&[0.1, 0.3, 0.35, 0.9], CdlpFilter::default()).unwrap();
        assert_eq!(model.segment_count(), 3);
        assert_eq!(model.onset().time, 0.1);
        assert_relative_eq!(model.total_duration(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(model.end_time(), 0.9, epsilon = 1e-12);
        assert!(model.targets().iter().all(|t| t.slope == 0.0 && t.offset == 0.0 && t.tau == 0.0));
    }

    #[test]
    fn bad_boundaries_are_config_errors() {
        let f = CdlpFilter::default();
        assert_eq!(ContourModel::from_boundaries(&[0.0], f).unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(
            ContourModel::from_boundaries(&[0.0, 0.2, 0.2], f).unwrap_err().kind(),
            ErrorKind::Config
        );
        assert_eq!(
            ContourModel::from_boundaries(&[0.0, f64::NAN], f).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn target_count_must_match_segments() {
        let mut model = ContourModel::from_boundaries(&[0.0, 0.2, 0.5], CdlpFilter::default()).unwrap();
        let err = model
            .set_pitch_targets(vec![PitchTarget::new(0.0, 100.0, 15.0, 0.2)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn uniform_grid_has_expected_length() {
        let model = two_segment_model();
        let f0 = model.calculate_f0(0.005).unwrap();
        assert_eq!(f0.len(), 101);
        assert_eq!(f0[0].time, 0.0);
        assert_relative_eq!(f0[100].time, 0.5, epsilon = 1e-12);
        assert!(f0.windows(2).all(|w| w[1].time >= w[0].time));
    }

    #[test]
    fn explicit_times_match_uniform_grid() {
        let model = two_segment_model();
        let uniform = model.calculate_f0(0.01).unwrap();
        let times: Vec<f64> = uniform.iter().map(|s| s.time).collect();
        let explicit = model.calculate_f0_at(&times);
        assert_eq!(uniform, explicit);
    }

    #[test]
    fn contour_moves_from_first_to_second_offset() {
        let model = two_segment_model();
        let f0 = model.calculate_f0_at(&[0.1, 0.2, 0.5]);
        assert_relative_eq!(f0[0].value, 100.0, epsilon = 1e-9);
        assert_relative_eq!(f0[1].value, 100.0, epsilon = 1e-6);
        assert_relative_eq!(f0[2].value, 105.0, epsilon = 1e-3);
    }

    #[test]
    fn sample_on_last_boundary_survives_rounding() {
        let mut model = ContourModel::from_boundaries(&[0.13, 1.2, 1.44, 1.66], CdlpFilter::default()).unwrap();
        model.set_onset_value(100.0);
        let targets = model
            .targets()
            .iter()
            .map(|t| PitchTarget::new(0.0, 100.0, 15.0, t.duration))
            .collect();
        model.set_pitch_targets(targets).unwrap();

        assert_eq!(model.end_time(), 1.66);
        let f0 = model.calculate_f0_at(&[1.66]);
        assert_eq!(f0.len(), 1);
        assert_relative_eq!(f0[0].value, 100.0, epsilon = 1e-9);

        let grid = model.calculate_f0(0.01).unwrap();
        assert_eq!(grid.last().unwrap().time, 1.66);
    }

    #[test]
    fn invalid_period_is_rejected() {
        let model = two_segment_model();
        assert!(model.calculate_f0(0.0).is_err());
        assert!(model.calculate_f0(f64::NAN).is_err());
    }
}
