//! Data sources other than user CSVs.
//!
//! - `synth`: noisy samples drawn from the curve model, for demos and tests

pub mod synth;

pub use synth::*;
