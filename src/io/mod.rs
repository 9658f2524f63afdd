//! Input/output helpers.
//!
//! - observable table ingest + validation (`ingest`)
//! - series CSV and simulator-format table exports (`export`)
//! - fit JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
