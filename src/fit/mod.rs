//! Parameter search.
//!
//! Responsibilities:
//!
//! - evaluate the L1 objective and residuals for a parameter vector (`objective`)
//! - global search over the parameter box (`evolution`, parallel per generation)
//! - robust bounded local refinement (`refine`)
//! - orchestrate both stages with the acceptance policy (`search`)

pub mod evolution;
pub mod objective;
pub mod refine;
pub mod search;

pub use evolution::*;
pub use objective::*;
pub use refine::*;
pub use search::*;
