//! Smogcast: traffic, weather and pollution data pipeline
//!
//! Cleans raw traffic counts, reduces daily weather and monthly pollution
//! records to one row per (Year, Month), joins them, persists every stage
//! and trains a pm2.5 model on the joined table.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod storage;
pub mod utils;
