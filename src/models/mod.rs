//! The fixed parametric curve model.
//!
//! Evaluation is a small, pure function of `(t, θ, M, X)` so that the objective and
//! search code can stay generic.

pub mod curve;

pub use curve::*;
