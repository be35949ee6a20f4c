//! Synthetic data.
//!
//! The fitter is normally fed Praat files; `synth` produces contours from
//! known targets instead, for demos and for checking that a fit recovers them.

pub mod synth;

pub use synth::*;
