//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model parameters and their box constraint (`Params`, `ParamBounds`)
//! - validated observations paired with the `t` grid (`Observations`)
//! - fit outputs (`FitOutcome`, `StageRecord`, `FitFile`, etc.)

pub mod types;

pub use types::*;
