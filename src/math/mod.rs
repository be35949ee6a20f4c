//! Mathematical utilities: combinatorics for the filter recursions, fit statistics and seed derivation.

pub mod combinatorics;
pub mod seed;
pub mod stats;

pub use combinatorics::*;
pub use stats::*;
