//! Reporting utilities: peak analysis and formatted terminal output.

pub mod format;
pub mod peaks;

pub use format::*;
pub use peaks::*;
