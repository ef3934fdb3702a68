//! CLI module - argument parsing and subcommand handlers

mod args;
pub mod commands;
pub mod run;

pub use args::{Cli, Commands};
pub use commands::{run_init_config, run_predict, run_profile, run_train, TrainOptions};
pub use run::{run_pipeline, train_and_evaluate};
