//! Input/output helpers.
//!
//! - segment boundaries from TextGrids (`textgrid`)
//! - pitch contours from/to PitchTiers (`pitch_tier`)
//! - target exports, gestural score and CSV (`export`)
//! - fit report JSON read/write (`report`)

pub mod export;
pub mod pitch_tier;
pub mod report;
pub mod textgrid;

pub use export::*;
pub use pitch_tier::*;
pub use report::*;
pub use textgrid::*;
