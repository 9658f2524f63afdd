//! `ising-curves` library crate.
//!
//! The binary (`ising`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the loader, aggregator and fitter are reusable without the CLI

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
