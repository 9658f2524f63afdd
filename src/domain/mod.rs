//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - lattice sizes, observables and loaded tables (`SizeKey`, `Observable`, `ObservableTable`)
//! - model kinds and fit outputs (`ModelKind`, `FitResult`, `FitStatus`)
//! - run configuration and the saved fit file (`AnalysisConfig`, `FitFile`)

pub mod types;

pub use types::*;
