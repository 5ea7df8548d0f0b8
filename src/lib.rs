pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod mdp;
pub mod utils;

pub use adapters::CommandToolchain;
pub use config::{cli::LocalStorage, toml_config::SetupConfig, CliConfig};
pub use core::{
    engine::{BuildEngine, Outcome, RunMode},
    pipeline::ExtensionPipeline,
};
pub use utils::error::{ForgeError, Result};
