//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - signal primitives (`Sample`, `TimeSignal`)
//! - per-segment targets (`PitchTarget`) and search settings (`ParameterSet`)
//! - run configuration and report schemas (`FitConfig`, `FitReportFile`)

pub mod types;

pub use types::*;
