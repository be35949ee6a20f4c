//! Command-line parsing for the pitch target fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::DEFAULT_FILTER_ORDER;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "tam",
    version,
    about = "Fit Target Approximation Model pitch targets to F0 contours"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit pitch targets to a PitchTier segmented by a TextGrid, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Generate a synthetic PitchTier (and boundary list) from known targets.
    Synth(SynthArgs),
    /// Plot a previously exported fit report.
    Plot(PlotArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// TextGrid (or plain list of times) with the segment boundaries.
    #[arg(value_name = "TEXTGRID")]
    pub textgrid: PathBuf,

    /// PitchTier with the observed F0 contour (Hz).
    #[arg(value_name = "PITCHTIER")]
    pub pitch_tier: PathBuf,

    /// Search half-width for target slopes (st/s).
    #[arg(long = "m-range", default_value_t = 50.0)]
    pub m_range: f64,

    /// Search half-width for target offsets (st).
    #[arg(long = "b-range", default_value_t = 20.0)]
    pub b_range: f64,

    /// Search half-width for time constants (ms).
    #[arg(long = "t-range", default_value_t = 5.0)]
    pub t_range: f64,

    /// Regularization weight of slopes.
    #[arg(long = "m-weight", default_value_t = 10.0)]
    pub m_weight: f64,

    /// Regularization weight of offsets.
    #[arg(long = "b-weight", default_value_t = 5.0)]
    pub b_weight: f64,

    /// Regularization weight of time constants.
    #[arg(long = "t-weight", default_value_t = 1.0)]
    pub t_weight: f64,

    /// Regularization strength (0 disables the penalty).
    #[arg(long, default_value_t = 0.0)]
    pub lambda: f64,

    /// Centre of the slope search range (st/s).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub mean_slope: f64,

    /// Centre of the offset search range (st); defaults to the mean of the observed F0.
    #[arg(long, allow_hyphen_values = true)]
    pub mean_offset: Option<f64>,

    /// Centre of the time-constant search range (ms).
    #[arg(long, default_value_t = 15.0)]
    pub mean_tau: f64,

    /// Restarts on top of five per segment.
    #[arg(short = 'r', long, default_value_t = 0)]
    pub restarts: usize,

    /// Random seed for restart start points.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Filter order.
    #[arg(long, default_value_t = DEFAULT_FILTER_ORDER)]
    pub order: usize,

    /// Objective evaluation budget of each local search.
    #[arg(long = "max-evals", default_value_t = 1_000_000)]
    pub max_evals: usize,

    /// Sampling rate (Hz) of the exported fitted contour.
    #[arg(long, default_value_t = 200.0)]
    pub output_rate: f64,

    /// Skip the ASCII plot that is otherwise rendered in the terminal.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the targets as a VocalTractLab gestural score.
    #[arg(short = 'g', long = "gesture")]
    pub gesture: Option<PathBuf>,

    /// Export the onset and targets as CSV.
    #[arg(short = 'c', long = "csv")]
    pub csv: Option<PathBuf>,

    /// Export the fitted contour as a PitchTier (Hz).
    #[arg(short = 'p', long = "pitch-tier")]
    pub pitch_tier_out: Option<PathBuf>,

    /// Export the full fit report as JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for synthetic contour generation.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output PitchTier (Hz).
    #[arg(short = 'o', long = "out", value_name = "PITCHTIER")]
    pub out: PathBuf,

    /// Output boundary list, readable as a TextGrid by `tam fit`.
    #[arg(long, value_name = "FILE")]
    pub boundaries_out: Option<PathBuf>,

    /// Segment boundaries (s), comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 0.2, 0.5])]
    pub boundaries: Vec<f64>,

    /// Onset value (st).
    #[arg(long, default_value_t = 100.0)]
    pub onset: f64,

    /// Target slopes (st/s), one per segment.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = vec![0.0, 0.0])]
    pub slopes: Vec<f64>,

    /// Target offsets (st), one per segment.
    #[arg(long, value_delimiter = ',', default_values_t = vec![100.0, 105.0])]
    pub offsets: Vec<f64>,

    /// Time constants (ms), one per segment.
    #[arg(long, value_delimiter = ',', default_values_t = vec![15.0, 15.0])]
    pub taus: Vec<f64>,

    /// Sampling rate (Hz).
    #[arg(long, default_value_t = 200.0)]
    pub rate: f64,

    /// Standard deviation of additive Gaussian noise (st).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Filter order.
    #[arg(long, default_value_t = DEFAULT_FILTER_ORDER)]
    pub order: usize,
}

/// Options for plotting a saved report.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Report JSON file produced by `tam fit --export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
