//! Configuration for the spawning engine.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line via clap. Every section uses `#[serde(default)]` so older
//! files keep loading when new settings are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BucketConfig, ContentConfig, DebugConfig, PlayerSpawnerConfig, SchedulingConfig,
    SpawnerConfig, ZoneConfig, default_config_dir,
};
pub use error::ConfigError;
