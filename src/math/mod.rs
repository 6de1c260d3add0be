//! Mathematical utilities: grids, the soft-L1 penalty, and least squares solves.

pub mod grid;
pub mod lsq;
pub mod robust;

pub use grid::*;
pub use lsq::*;
pub use robust::*;
