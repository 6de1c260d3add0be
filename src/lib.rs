//! `curve-fit` library crate.
//!
//! Fits the angle θ, decay rate M and offset X of a fixed parametric curve to
//! observed (x, y) points under an L1 objective: differential evolution over
//! the parameter box, then an optional robust least-squares refinement.
//!
//! The binary (`curvefit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitter can be embedded without the CLI

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
