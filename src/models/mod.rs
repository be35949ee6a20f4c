//! Target approximation model.
//!
//! - `filter`: the critically damped filter that turns targets into a smooth contour
//! - `contour`: the onset + per-segment targets container that drives the filter

pub mod contour;
pub mod filter;

pub use contour::*;
pub use filter::*;
