//! Plot rendering.
//!
//! - `ascii`: fixed-size terminal plot
//! - `svg`: standalone SVG chart (plotters)
//! - `history`: SVG chart of the per-stage loss

pub mod ascii;
pub mod history;
pub mod svg;

pub use ascii::*;
pub use history::*;
pub use svg::*;
