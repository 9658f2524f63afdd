//! Chart preparation and renderers.
//!
//! `chart` builds render-only descriptions; `svg` and `ascii` draw them.

pub mod ascii;
pub mod chart;
pub mod svg;

pub use ascii::*;
pub use chart::*;
pub use svg::*;
