//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one model to one size's magnetization (Levenberg–Marquardt)
//! - fit every loaded size independently (parallel)

pub mod batch;
pub mod fitter;

pub use batch::*;
pub use fitter::*;
