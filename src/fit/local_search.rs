//! Bound-constrained local search from objective values alone.
//!
//! The box is removed by a change of variables, `x = c + r·sin(u)` with `c`
//! the box centre and `r` its half-width, so every `u` maps inside
//! `[lower, upper]`. The unconstrained problem in `u` is solved with argmin's
//! L-BFGS and a More–Thuente line search. Gradients are central differences
//! of the cost (finitediff), i.e. a `2n + 1` point stencil per gradient.
//!
//! The settings keep BOBYQA's names: a start closer than `rho_begin` to a
//! bound is moved `rho_begin` inside, and `rho_end` is the gradient tolerance.
//!
//! The result is the best point evaluated, stencil points included. When the
//! line search stalls on rounding noise the search ends there instead of
//! failing; only an exhausted evaluation budget is an error.

use std::cell::{Cell, RefCell};

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use finitediff::FiniteDiff;
use log::debug;
use thiserror::Error;

/// L-BFGS history length.
const LBFGS_MEMORY: usize = 7;

type Param = Vec<f64>;
type Lbfgs = LBFGS<MoreThuenteLineSearch<Param, Param, f64>, Param, Param, f64>;

/// Failures of a single local search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("start point and bounds disagree in length ({start} vs {lower}/{upper})")]
    DimensionMismatch {
        start: usize,
        lower: usize,
        upper: usize,
    },
    #[error("bounds too narrow in dimension {index}: upper - lower = {span} < 2·rho_begin = {required}")]
    InvalidBounds {
        index: usize,
        span: f64,
        required: f64,
    },
    #[error("invalid radii rho_begin = {rho_begin}, rho_end = {rho_end} (need 0 < rho_end < rho_begin)")]
    InvalidTrustRegion { rho_begin: f64, rho_end: f64 },
    #[error("{given} interpolation points given for dimension {dimension}; this solver uses {expected}")]
    InvalidInterpolationPoints {
        given: usize,
        dimension: usize,
        expected: usize,
    },
    #[error("objective is not finite at the start point")]
    NonFiniteStart,
    #[error("maximum number of objective evaluations ({0}) exceeded")]
    MaxEvaluations(usize),
    #[error("L-BFGS failed: {0}")]
    Lbfgs(String),
}

impl From<ArgminError> for SolverError {
    fn from(err: ArgminError) -> Self {
        match err.downcast::<SolverError>() {
            Ok(own) => own,
            Err(other) => SolverError::Lbfgs(other.to_string()),
        }
    }
}

/// Solver settings, named after their BOBYQA counterparts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSearchSettings {
    pub rho_begin: f64,
    pub rho_end: f64,
    pub interpolation_points: usize,
    pub max_evaluations: usize,
}

/// Result of a converged local search.
#[derive(Debug, Clone)]
pub struct LocalMinimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

/// Smooth bijection between `u ∈ ℝⁿ` and the box.
#[derive(Debug, Clone)]
struct BoxMap {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoxMap {
    fn to_box(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(u, (&lo, &hi))| {
                let (centre, radius) = (0.5 * (lo + hi), 0.5 * (hi - lo));
                (centre + radius * u.sin()).clamp(lo, hi)
            })
            .collect()
    }

    fn from_box(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(x, (&lo, &hi))| {
                let (centre, radius) = (0.5 * (lo + hi), 0.5 * (hi - lo));
                ((x - centre) / radius).clamp(-1.0, 1.0).asin()
            })
            .collect()
    }
}

/// Lowest finite cost evaluated so far and its point in the box.
type BestPoint = Option<(f64, Vec<f64>)>;

/// The objective seen through [`BoxMap`], with an evaluation budget.
struct BoxedProblem<'a, F> {
    f: &'a F,
    map: &'a BoxMap,
    evaluations: &'a Cell<usize>,
    best: &'a RefCell<BestPoint>,
    max_evaluations: usize,
}

impl<F> CostFunction for BoxedProblem<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Param;
    type Output = f64;

    fn cost(&self, u: &Self::Param) -> Result<Self::Output, ArgminError> {
        let used = self.evaluations.get();
        if used >= self.max_evaluations {
            return Err(SolverError::MaxEvaluations(self.max_evaluations).into());
        }
        self.evaluations.set(used + 1);
        let x = self.map.to_box(u);
        let value = (self.f)(&x);
        if !value.is_finite() {
            return Ok(f64::INFINITY);
        }
        let mut best = self.best.borrow_mut();
        if best.as_ref().is_none_or(|(b, _)| value < *b) {
            *best = Some((value, x));
        }
        Ok(value)
    }
}

impl<F> Gradient for BoxedProblem<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Param;
    type Gradient = Param;

    /// Central differences of the cost. The difference closure cannot return
    /// an error, so the first one is parked in `failure` and re-raised after.
    fn gradient(&self, u: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        let failure: RefCell<Option<ArgminError>> = RefCell::new(None);
        let cost = |u: &Param| -> f64 {
            match self.cost(u) {
                Ok(value) => value,
                Err(e) => {
                    let mut slot = failure.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    f64::NAN
                }
            }
        };
        let grad = u.central_diff(&cost);
        match failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(grad),
        }
    }
}

/// Minimize `f` over the box `[lower, upper]` starting from `x0`.
///
/// `x0` is first pulled at least `rho_begin` inside every bound. Every point
/// handed to `f` lies inside the box.
pub fn find_min_bounded<F>(
    f: &F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    settings: &LocalSearchSettings,
) -> Result<LocalMinimum, SolverError>
where
    F: Fn(&[f64]) -> f64,
{
    validate(x0, lower, upper, settings)?;

    let map = BoxMap {
        lower: lower.to_vec(),
        upper: upper.to_vec(),
    };
    let evaluations = Cell::new(0);
    let best = RefCell::new(None);
    let problem = BoxedProblem {
        f,
        map: &map,
        evaluations: &evaluations,
        best: &best,
        max_evaluations: settings.max_evaluations,
    };

    let start = map.from_box(&pull_inside(x0, lower, upper, settings.rho_begin));
    if !problem.cost(&start)?.is_finite() {
        return Err(SolverError::NonFiniteStart);
    }

    let solver: Lbfgs = LBFGS::new(MoreThuenteLineSearch::new(), LBFGS_MEMORY)
        .with_tolerance_grad(settings.rho_end)?;
    let outcome = Executor::new(problem, solver)
        .configure(|state| state.param(start).max_iters(settings.max_evaluations as u64))
        .run();

    match outcome.map_err(SolverError::from) {
        Ok(result) => {
            if let TerminationStatus::Terminated(TerminationReason::MaxItersReached) =
                result.state().get_termination_status()
            {
                return Err(SolverError::MaxEvaluations(settings.max_evaluations));
            }
        }
        Err(err @ SolverError::MaxEvaluations(_)) => return Err(err),
        Err(err) => debug!("line search stalled, keeping best point: {err}"),
    }

    let evaluations = evaluations.get();
    match best.into_inner() {
        Some((value, x)) => Ok(LocalMinimum { x, value, evaluations }),
        None => Err(SolverError::NonFiniteStart),
    }
}

fn validate(x0: &[f64], lower: &[f64], upper: &[f64], settings: &LocalSearchSettings) -> Result<(), SolverError> {
    let n = x0.len();
    if lower.len() != n || upper.len() != n || n == 0 {
        return Err(SolverError::DimensionMismatch {
            start: n,
            lower: lower.len(),
            upper: upper.len(),
        });
    }
    let (rho_begin, rho_end) = (settings.rho_begin, settings.rho_end);
    if !(rho_end > 0.0 && rho_begin > rho_end && rho_begin.is_finite()) {
        return Err(SolverError::InvalidTrustRegion { rho_begin, rho_end });
    }
    let expected = 2 * n + 1;
    if settings.interpolation_points != expected {
        return Err(SolverError::InvalidInterpolationPoints {
            given: settings.interpolation_points,
            dimension: n,
            expected,
        });
    }
    for (index, (lo, hi)) in lower.iter().zip(upper).enumerate() {
        let span = hi - lo;
        if !(span >= 2.0 * rho_begin) {
            return Err(SolverError::InvalidBounds {
                index,
                span,
                required: 2.0 * rho_begin,
            });
        }
    }
    Ok(())
}

/// Move every coordinate at least `rho` away from its bounds.
fn pull_inside(x: &[f64], lower: &[f64], upper: &[f64], rho: f64) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo + rho, hi - rho))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn settings(n: usize, rho_begin: f64) -> LocalSearchSettings {
        LocalSearchSettings {
            rho_begin,
            rho_end: 1e-8,
            interpolation_points: 2 * n + 1,
            max_evaluations: 100_000,
        }
    }

    #[test]
    fn minimizes_coupled_quadratic() {
        let f = |x: &[f64]| {
            let (a, b) = (x[0] - 1.0, x[1] + 2.0);
            3.0 * a * a + 2.0 * a * b + b * b + 1.0
        };
        let res = find_min_bounded(&f, &[4.0, 4.0], &[-10.0, -10.0], &[10.0, 10.0], &settings(2, 2.0)).unwrap();
        assert_abs_diff_eq!(res.x[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(res.x[1], -2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(res.value, 1.0, epsilon = 1e-7);
        assert!(res.evaluations > 0);
    }

    #[test]
    fn stops_on_active_bound() {
        let f = |x: &[f64]| (x[0] - 5.0).powi(2) + (x[1] - 0.5).powi(2);
        let res = find_min_bounded(&f, &[0.0, 0.0], &[-3.0, -3.0], &[3.0, 3.0], &settings(2, 1.0)).unwrap();
        assert_abs_diff_eq!(res.x[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(res.x[1], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn every_evaluated_point_is_inside_the_box() {
        let seen = RefCell::new(Vec::new());
        let f = |x: &[f64]| {
            seen.borrow_mut().push(x.to_vec());
            (x[0] + 7.0).powi(2) + (x[1] * x[0]).sin() + x[1].powi(2)
        };
        let (lo, hi) = ([-2.0, -2.0], [2.0, 2.0]);
        let _ = find_min_bounded(&f, &[1.0, -1.0], &lo, &hi, &settings(2, 1.5));
        let seen = seen.into_inner();
        assert!(!seen.is_empty());
        for p in &seen {
            assert!(p.iter().zip(lo.iter().zip(&hi)).all(|(v, (l, h))| v >= l && v <= h));
        }
    }

    #[test]
    fn evaluation_budget_is_enforced() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2);
        let mut s = settings(1, 2.0);
        s.max_evaluations = 4;
        let err = find_min_bounded(&f, &[0.0], &[-5.0], &[5.0], &s).unwrap_err();
        assert_eq!(err, SolverError::MaxEvaluations(4));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let f = |x: &[f64]| x[0] * x[0];
        let (x0, lo, hi) = ([0.0], [-1.0], [1.0]);

        let err = find_min_bounded(&f, &x0, &lo, &hi, &settings(1, 2.0)).unwrap_err();
        assert!(matches!(err, SolverError::InvalidBounds { index: 0, .. }));

        let mut s = settings(1, 0.5);
        s.rho_end = 1.0;
        assert!(matches!(
            find_min_bounded(&f, &x0, &lo, &hi, &s).unwrap_err(),
            SolverError::InvalidTrustRegion { .. }
        ));

        let mut s = settings(1, 0.5);
        s.interpolation_points = 5;
        assert!(matches!(
            find_min_bounded(&f, &x0, &lo, &hi, &s).unwrap_err(),
            SolverError::InvalidInterpolationPoints { expected: 3, .. }
        ));

        assert!(matches!(
            find_min_bounded(&f, &x0, &[-1.0, -1.0], &hi, &settings(1, 0.5)).unwrap_err(),
            SolverError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn non_finite_start_is_reported() {
        let f = |_: &[f64]| f64::NAN;
        assert_eq!(
            find_min_bounded(&f, &[0.0], &[-5.0], &[5.0], &settings(1, 1.0)).unwrap_err(),
            SolverError::NonFiniteStart
        );
    }

    #[test]
    fn box_map_round_trips_interior_points() {
        let map = BoxMap {
            lower: vec![-1.0, 10.0],
            upper: vec![3.0, 20.0],
        };
        let x = [0.25, 17.5];
        let back = map.to_box(&map.from_box(&x));
        assert_abs_diff_eq!(back[0], x[0], epsilon = 1e-12);
        assert_abs_diff_eq!(back[1], x[1], epsilon = 1e-12);

        for u in [-1e6, -3.0, 0.0, 1.7, 42.0] {
            let p = map.to_box(&[u, u]);
            assert!((-1.0..=3.0).contains(&p[0]) && (10.0..=20.0).contains(&p[1]));
        }
    }

    #[test]
    fn start_is_pulled_off_the_bounds() {
        assert_eq!(pull_inside(&[-1.0, 0.95, 0.0], &[-1.0; 3], &[1.0; 3], 0.25), vec![-0.75, 0.75, 0.0]);
    }

    #[test]
    fn result_is_the_best_evaluated_point() {
        let seen = RefCell::new(Vec::new());
        let f = |x: &[f64]| {
            let v = (x[0] - 0.7).powi(2) + 0.5 * (x[1] + 0.2).powi(2);
            seen.borrow_mut().push(v);
            v
        };
        let res = find_min_bounded(&f, &[-1.0, 1.0], &[-2.0, -2.0], &[2.0, 2.0], &settings(2, 0.5)).unwrap();
        let seen = seen.into_inner();
        assert_eq!(res.evaluations, seen.len());
        assert_eq!(res.value, seen.iter().copied().fold(f64::INFINITY, f64::min));
        let at_x = (res.x[0] - 0.7).powi(2) + 0.5 * (res.x[1] + 0.2).powi(2);
        assert_eq!(res.value, at_x);
    }

    #[test]
    fn argmin_errors_keep_own_failures() {
        let err: ArgminError = SolverError::MaxEvaluations(7).into();
        assert_eq!(SolverError::from(err), SolverError::MaxEvaluations(7));
    }
}
