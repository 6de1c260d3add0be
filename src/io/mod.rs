//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - per-point result export (CSV) (`export`)
//! - fit JSON read/write (`fit_file`)

pub mod export;
pub mod fit_file;
pub mod ingest;

pub use export::*;
pub use fit_file::*;
pub use ingest::*;
