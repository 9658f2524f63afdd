//! Data preparation: aggregation of loaded tables and synthetic samples.

pub mod aggregate;
pub mod sample;

pub use aggregate::*;
pub use sample::*;
