//! Pipeline module - cleaning, temporal alignment and model input preparation

pub mod aggregate;
pub mod cleaner;
pub mod features;
pub mod impute;
pub mod loader;
pub mod merge;
pub mod missing;
pub mod target;

pub use aggregate::*;
pub use cleaner::{title_case, CleaningRule, CleaningRules};
pub use features::*;
pub use impute::*;
pub use loader::*;
pub use merge::*;
pub use missing::*;
pub use target::*;
