use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tam_fit::domain::{ParameterSet, PitchTarget, Sample};
use tam_fit::fit::{FitObjective, SearchBounds};
use tam_fit::models::{CdlpFilter, ContourModel, FilterState};

const PROPTEST_CASES: u32 = 128;

fn target() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-50.0f64..50.0, 80.0f64..120.0, 10.0f64..40.0, 0.1f64..0.4)
}

/// One-sided second-order derivative estimates at `b` from the left and right.
fn one_sided_slopes(f: impl Fn(f64) -> f64, b: f64, h: f64) -> (f64, f64) {
    let left = (3.0 * f(b) - 4.0 * f(b - h) + f(b - 2.0 * h)) / (2.0 * h);
    let right = (-3.0 * f(b) + 4.0 * f(b + h) - f(b + 2.0 * h)) / (2.0 * h);
    (left, right)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn contour_is_smooth_across_boundary(
        onset in 80.0f64..120.0,
        first in target(),
        second in target(),
    ) {
        let filter = CdlpFilter::default();
        let targets = [
            PitchTarget::new(first.0, first.1, first.2, first.3),
            PitchTarget::new(second.0, second.1, second.2, second.3),
        ];
        let b = first.3;
        let h = 1e-5;
        let at = |t: f64| filter.response(Sample::new(0.0, onset), &targets, &[t])[0].value;

        let (left, right) = one_sided_slopes(at, b, h);
        prop_assert!((at(b) - at(b + 1e-9)).abs() < 1e-4);
        prop_assert!(
            (left - right).abs() < 0.05 + 1e-3 * left.abs(),
            "slopes differ at boundary: {left} vs {right}"
        );
    }

    #[test]
    fn boundary_state_carries_all_derivatives(
        onset in 80.0f64..120.0,
        first in target(),
        second in target(),
    ) {
        let filter = CdlpFilter::default();
        let t1 = PitchTarget::new(first.0, first.1, first.2, first.3);
        let t2 = PitchTarget::new(second.0, second.1, second.2, second.3);

        let start = FilterState::at_rest(onset, filter.order());
        let end = filter.segment_response(&start, &t1, 0.0, &[]).end_state;
        let entry = filter.state_at(&filter.coefficients(&end, &t2), &t2, 0.0);

        // Derivative n naturally scales with decay_rate^n times the target gap.
        let decay = t2.decay_rate();
        for (n, (a, b)) in entry.derivatives().iter().zip(end.derivatives()).enumerate() {
            let scale = 1.0 + b.abs() + 100.0 * decay.powi(n as i32);
            prop_assert!((a - b).abs() <= 1e-9 * scale, "derivative {n}: {a} vs {b}");
        }
    }

    #[test]
    fn uniform_grid_length(durations in prop::collection::vec(0.05f64..0.5, 1..5), rate in 50.0f64..400.0) {
        let mut boundaries = vec![0.0];
        for d in &durations {
            let last = *boundaries.last().unwrap();
            boundaries.push(last + d);
        }
        let model = ContourModel::from_boundaries(&boundaries, CdlpFilter::default()).unwrap();
        let period = 1.0 / rate;
        let total = model.total_duration();
        let expected = (total / period + 1e-9).floor() as usize + 1;
        prop_assert_eq!(model.sample_times(period).unwrap().len(), expected);
    }

    #[test]
    fn evaluation_is_pure(seed in any::<u64>()) {
        let mut model = ContourModel::from_boundaries(&[0.0, 0.15, 0.4], CdlpFilter::default()).unwrap();
        model.set_onset_value(100.0);
        model.set_pitch_targets(vec![
            PitchTarget::new(10.0, 102.0, 20.0, 0.15),
            PitchTarget::new(-10.0, 98.0, 20.0, 0.25),
        ]).unwrap();
        let observed = model.calculate_f0(0.01).unwrap();

        let mut ps = ParameterSet::with_mean_offset(100.0);
        ps.lambda = 0.3;
        let objective = FitObjective::new(observed, vec![0.0, 0.15, 0.4], ps, CdlpFilter::default()).unwrap();
        let bounds = SearchBounds::from_parameters(&ps, 2);
        let x = bounds.sample(&mut StdRng::seed_from_u64(seed));

        prop_assert!(bounds.contains(&x));
        let first = objective.evaluate(&x);
        let second = objective.evaluate(&x);
        prop_assert!(first.is_finite() && first >= 0.0);
        prop_assert_eq!(first.to_bits(), second.to_bits());
    }
}
