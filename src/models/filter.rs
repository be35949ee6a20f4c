//! Critically damped low-pass filter driven by linear pitch targets.
//!
//! Within a segment the response is
//!
//! ```text
//! y(t) = (c0 + c1·t + … + c{N-1}·t^{N-1}) · exp(-λ t) + slope·t + offset,   λ = 1000 / tau
//! ```
//!
//! with `t` measured from the segment start. The polynomial coefficients are
//! chosen so that `y` and its first `N-1` derivatives at `t = 0` equal the
//! filter state inherited from the previous segment; the state at the segment
//! end is then handed to the next segment. This makes the contour continuous
//! in value and in `N-1` derivatives at every boundary.

use std::ops::ControlFlow;

use crate::domain::{PitchTarget, Sample, TimeSignal};
use crate::error::AppError;
use crate::math::{binomial, factorial};

/// Order used by the fitter unless configured otherwise.
pub const DEFAULT_FILTER_ORDER: usize = 5;

/// Highest supported order; beyond this the factorial-weighted recursions lose precision.
pub const MAX_FILTER_ORDER: usize = 12;

/// Value and derivatives `0..N` of the contour at a segment boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    derivatives: Vec<f64>,
}

impl FilterState {
    /// State of a contour resting at `value` (all derivatives zero).
    pub fn at_rest(value: f64, order: usize) -> Self {
        let mut derivatives = vec![0.0; order];
        if let Some(first) = derivatives.first_mut() {
            *first = value;
        }
        Self { derivatives }
    }

    pub fn from_derivatives(derivatives: Vec<f64>) -> Self {
        Self { derivatives }
    }

    pub fn order(&self) -> usize {
        self.derivatives.len()
    }

    /// Contour value (0th derivative).
    pub fn value(&self) -> f64 {
        self.derivatives.first().copied().unwrap_or(0.0)
    }

    pub fn derivatives(&self) -> &[f64] {
        &self.derivatives
    }
}

/// Polynomial coefficients of one segment's free response.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    values: Vec<f64>,
}

impl FilterCoefficients {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Output of one fold step: the segment's samples and the state at its end.
#[derive(Debug, Clone)]
pub struct SegmentResponse {
    pub samples: TimeSignal,
    pub end_state: FilterState,
}

/// Critically damped low-pass filter of fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdlpFilter {
    order: usize,
}

impl Default for CdlpFilter {
    fn default() -> Self {
        Self {
            order: DEFAULT_FILTER_ORDER,
        }
    }
}

impl CdlpFilter {
    pub fn new(order: usize) -> Result<Self, AppError> {
        if !(1..=MAX_FILTER_ORDER).contains(&order) {
            return Err(AppError::config(format!(
                "Invalid filter order {order} (must be in 1..={MAX_FILTER_ORDER})."
            )));
        }
        Ok(Self { order })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Match the free response to `state` at the segment start.
    ///
    /// # Panics
    /// Panics if `state` was built for a different filter order.
    pub fn coefficients(&self, state: &FilterState, target: &PitchTarget) -> FilterCoefficients {
        assert_eq!(
            state.order(),
            self.order,
            "filter state length does not match filter order"
        );

        let n_order = self.order;
        let decay = -target.decay_rate();
        let x = state.derivatives();

        let mut c = vec![0.0; n_order];
        c[0] = x[0] - target.offset;
        for n in 1..n_order {
            let mut acc: f64 = (0..n)
                .map(|i| c[i] * decay.powi((n - i) as i32) * binomial(n, i) * factorial(i))
                .sum();
            if n == 1 {
                // The linear trend contributes `slope` to the first derivative.
                acc += target.slope;
            }
            c[n] = (x[n] - acc) / factorial(n);
        }

        FilterCoefficients { values: c }
    }

    /// Contour value at local time `t` (seconds since segment start).
    pub fn evaluate(&self, coeffs: &FilterCoefficients, target: &PitchTarget, t: f64) -> f64 {
        let poly = coeffs
            .as_slice()
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c);
        poly * (-target.decay_rate() * t).exp() + target.slope * t + target.offset
    }

    /// Value and derivatives of the segment response at local time `t`.
    pub fn state_at(&self, coeffs: &FilterCoefficients, target: &PitchTarget, t: f64) -> FilterState {
        let n_order = self.order;
        let decay = -target.decay_rate();
        let c = coeffs.as_slice();
        let damping = (decay * t).exp();

        let mut derivatives = vec![0.0; n_order];
        for (n, slot) in derivatives.iter_mut().enumerate() {
            // d^n/dt^n [p(t)·e^{-λt}] = Σ_k C(n,k) p^{(k)}(t) (-λ)^{n-k} e^{-λt}
            let mut acc = 0.0;
            for i in 0..n_order {
                let q: f64 = (0..(n_order - i).min(n + 1))
                    .map(|k| {
                        decay.powi((n - k) as i32) * binomial(n, k) * c[i + k] * factorial(k + i)
                            / factorial(i)
                    })
                    .sum();
                acc += t.powi(i as i32) * q;
            }
            *slot = acc * damping;
        }

        // The polynomial part only models the deviation from the linear trend.
        if n_order >= 1 {
            derivatives[0] += target.offset + target.slope * t;
        }
        if n_order >= 2 {
            derivatives[1] += target.slope;
        }

        FilterState { derivatives }
    }

    /// Evaluate one segment at `times` and propagate the state to its end.
    ///
    /// `times` are the sample times assigned to this segment; they are not
    /// range-checked here.
    pub fn segment_response(
        &self,
        state: &FilterState,
        target: &PitchTarget,
        begin: f64,
        times: &[f64],
    ) -> SegmentResponse {
        let coeffs = self.coefficients(state, target);
        let samples = times
            .iter()
            .map(|&time| Sample::new(time, self.evaluate(&coeffs, target, time - begin)))
            .collect();
        let end_state = self.state_at(&coeffs, target, target.duration);
        SegmentResponse { samples, end_state }
    }

    /// Full contour for `onset` followed by `targets`, sampled at `times`.
    ///
    /// Segment ends are accumulated from the target durations. Callers that
    /// hold the boundary times should use [`CdlpFilter::response_with_ends`]
    /// so that samples on a boundary are not lost to rounding.
    pub fn response(&self, onset: Sample, targets: &[PitchTarget], times: &[f64]) -> TimeSignal {
        let ends: Vec<f64> = targets
            .iter()
            .scan(onset.time, |end, t| {
                *end += t.duration;
                Some(*end)
            })
            .collect();
        self.response_with_ends(onset, targets, &ends, times)
    }

    /// Full contour with explicit segment end times (`ends[i]` closes `targets[i]`).
    ///
    /// `times` must be non-decreasing. A time belongs to the first segment whose
    /// end is not before it, so a time on a boundary is evaluated in the earlier
    /// segment. Times after the last end produce no samples, and the traversal
    /// stops as soon as all times are consumed.
    pub fn response_with_ends(
        &self,
        onset: Sample,
        targets: &[PitchTarget],
        ends: &[f64],
        times: &[f64],
    ) -> TimeSignal {
        assert_eq!(targets.len(), ends.len(), "one end time per target");
        let mut signal = Vec::with_capacity(times.len());
        let mut remaining = times;

        let start = (FilterState::at_rest(onset.value, self.order), onset.time);
        let _ = targets.iter().zip(ends).try_fold(start, |(state, begin), (target, &end)| {
            if remaining.is_empty() {
                return ControlFlow::Break(());
            }
            let split = remaining.partition_point(|&t| t <= end);
            let (segment_times, rest) = remaining.split_at(split);

            let step = self.segment_response(&state, target, begin, segment_times);
            signal.extend(step.samples);
            remaining = rest;
            ControlFlow::Continue((step.end_state, end))
        });

        signal
    }
}
