//! Report module - evaluation results, dataset profiles and run summaries

pub mod evaluation;
pub mod profile;
pub mod summary;

pub use evaluation::*;
pub use profile::*;
pub use summary::*;
