//! Contour fitting.
//!
//! Responsibilities:
//!
//! - map parameter vectors to a regularized cost (`objective`)
//! - minimize that cost inside a box from function values alone (`local_search`)
//! - repeat the local search from random starts and keep the best (`multistart`)

pub mod local_search;
pub mod multistart;
pub mod objective;

pub use local_search::*;
pub use multistart::*;
pub use objective::*;
