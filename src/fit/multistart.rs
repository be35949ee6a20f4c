//! Randomized multi-start search over the fit objective.
//!
//! Every restart draws a uniform start point inside the search box and runs
//! the bound-constrained local solver from there. Restarts are independent,
//! so they run in parallel; each one owns its own seeded RNG and the winner is
//! chosen by a deterministic reduction over the collected outcomes.

use log::{debug, info, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::ParameterSet;
use crate::error::{AppError, ErrorKind};
use crate::fit::local_search::{LocalMinimum, LocalSearchSettings, SolverError, find_min_bounded};
use crate::fit::objective::FitObjective;
use crate::math::seed::stream_seed;

/// Baseline restarts contributed by every segment.
pub const RESTARTS_PER_SEGMENT: usize = 5;

/// Final trust-region radius of every local search.
pub const RHO_END: f64 = 1e-6;

pub const DEFAULT_MAX_EVALUATIONS: usize = 1_000_000;

/// Box constraints in the objective's parameter layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl SearchBounds {
    /// The onset shares the offset box; every segment gets the same three boxes.
    pub fn from_parameters(parameters: &ParameterSet, segments: usize) -> Self {
        let mut boxes = Vec::with_capacity(3 * segments + 1);
        boxes.push(parameters.offset_bounds());
        for _ in 0..segments {
            boxes.push(parameters.slope_bounds());
            boxes.push(parameters.offset_bounds());
            boxes.push(parameters.tau_bounds());
        }
        let (lower, upper) = boxes.into_iter().unzip();
        Self { lower, upper }
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    /// Uniform point inside the box.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| rng.gen_range(lo..=hi))
            .collect()
    }
}

/// Starting trust-region radius: half of the narrowest range, less one half.
pub fn initial_radius(parameters: &ParameterSet) -> f64 {
    let narrowest = (2.0 * parameters.delta_slope)
        .min(2.0 * parameters.delta_offset)
        .min(2.0 * parameters.delta_tau);
    (narrowest - 1.0) / 2.0
}

/// What happened to one restart.
#[derive(Debug, Clone, PartialEq)]
pub enum RestartOutcome {
    Accepted {
        index: usize,
        start: Vec<f64>,
        x: Vec<f64>,
        cost: f64,
        evaluations: usize,
    },
    Discarded {
        index: usize,
        reason: String,
    },
}

impl RestartOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Accepted { index, .. } | Self::Discarded { index, .. } => *index,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Outcome of a whole multi-start run.
#[derive(Debug, Clone)]
pub struct MultiStartReport {
    pub best_index: usize,
    pub best_cost: f64,
    pub best_x: Vec<f64>,
    pub bounds: SearchBounds,
    pub outcomes: Vec<RestartOutcome>,
}

impl MultiStartReport {
    pub fn restarts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn total_evaluations(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                RestartOutcome::Accepted { evaluations, .. } => *evaluations,
                RestartOutcome::Discarded { .. } => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiStartOptimizer {
    pub extra_restarts: usize,
    pub seed: u64,
    pub max_evaluations: usize,
}

impl MultiStartOptimizer {
    pub fn new(extra_restarts: usize, seed: u64) -> Self {
        Self {
            extra_restarts,
            seed,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
        }
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    pub fn restart_count(&self, segments: usize) -> usize {
        self.extra_restarts + RESTARTS_PER_SEGMENT * segments
    }

    /// Run every restart and store the best parameter vector in `objective`.
    ///
    /// Individual restarts that fail, or that end on a non-positive cost, are
    /// discarded. The call fails only when no restart survives.
    pub fn optimize(&self, objective: &mut FitObjective) -> Result<MultiStartReport, AppError> {
        let parameters = *objective.parameters();
        let segments = objective.segment_count();
        let bounds = SearchBounds::from_parameters(&parameters, segments);

        let rho_begin = initial_radius(&parameters);
        if !(rho_begin > RHO_END) {
            return Err(AppError::config(format!(
                "Search ranges are too narrow: the smallest range must exceed {} (got slope {}, offset {}, tau {}).",
                1.0 + 2.0 * RHO_END,
                2.0 * parameters.delta_slope,
                2.0 * parameters.delta_offset,
                2.0 * parameters.delta_tau
            )));
        }
        let settings = LocalSearchSettings {
            rho_begin,
            rho_end: RHO_END,
            interpolation_points: 2 * bounds.dimension() + 1,
            max_evaluations: self.max_evaluations,
        };

        let restarts = self.restart_count(segments);
        info!(
            "Fitting {segments} segment(s): {restarts} restart(s), dimension {}, rho {rho_begin} -> {RHO_END}",
            bounds.dimension()
        );

        let shared: &FitObjective = objective;
        let cost = |x: &[f64]| shared.evaluate(x);

        let outcomes: Vec<RestartOutcome> = (0..restarts)
            .into_par_iter()
            .map(|index| {
                let mut rng = StdRng::seed_from_u64(restart_seed(self.seed, index));
                let start = bounds.sample(&mut rng);
                let result = find_min_bounded(&cost, &start, &bounds.lower, &bounds.upper, &settings);
                classify(index, start, result)
            })
            .collect();

        for outcome in &outcomes {
            if let RestartOutcome::Discarded { index, reason } = outcome {
                warn!("restart {index} discarded: {reason}");
            }
        }

        let (best_index, best_x, best_cost) = select_best(&outcomes)?;

        let (onset_value, targets) = objective.decode(&best_x)?;
        objective.set_optimum(onset_value, targets)?;

        let report = MultiStartReport {
            best_index,
            best_cost,
            best_x,
            bounds,
            outcomes,
        };
        info!(
            "Best restart {best_index}: cost {best_cost:.6e} ({} of {} accepted, {} evaluations)",
            report.accepted_count(),
            report.restarts(),
            report.total_evaluations()
        );
        Ok(report)
    }
}

/// Sort one local search result into accepted or discarded.
///
/// Solver failures and non-positive or non-finite costs are discarded.
fn classify(index: usize, start: Vec<f64>, result: Result<LocalMinimum, SolverError>) -> RestartOutcome {
    match result {
        Ok(min) if min.value > 0.0 && min.value.is_finite() => {
            debug!(
                "restart {index}: cost {:.6e} after {} evaluations",
                min.value, min.evaluations
            );
            RestartOutcome::Accepted {
                index,
                start,
                x: min.x,
                cost: min.value,
                evaluations: min.evaluations,
            }
        }
        Ok(min) => RestartOutcome::Discarded {
            index,
            reason: format!("non-positive cost {}", min.value),
        },
        Err(err) => RestartOutcome::Discarded {
            index,
            reason: err.to_string(),
        },
    }
}

/// Lowest accepted cost, ties broken by restart index.
fn select_best(outcomes: &[RestartOutcome]) -> Result<(usize, Vec<f64>, f64), AppError> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            RestartOutcome::Accepted { index, x, cost, .. } => Some((*index, x, *cost)),
            RestartOutcome::Discarded { .. } => None,
        })
        .reduce(|best, c| if c.2 < best.2 || (c.2 == best.2 && c.0 < best.0) { c } else { best })
        .map(|(index, x, cost)| (index, x.clone(), cost))
        .ok_or_else(|| {
            AppError::new(
                ErrorKind::Convergence,
                format!(
                    "None of the {} restarts converged to a valid result; widen the search ranges or add restarts.",
                    outcomes.len()
                ),
            )
        })
}

/// Independent RNG seed for one restart.
fn restart_seed(seed: u64, index: usize) -> u64 {
    stream_seed(seed, index as u64)
}
