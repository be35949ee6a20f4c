//! `tam-fit` library crate.
//!
//! Fits Target Approximation Model pitch targets to F0 contours: a critically
//! damped filter turns per-segment linear targets into a smooth contour, and a
//! randomized multi-start, derivative-free search finds the targets that best
//! reproduce an observed pitch track.
//!
//! The binary (`tam`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable outside the command line
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
