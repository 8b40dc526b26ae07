//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::SpawnerConfig;

/// Spawner command-line arguments.
///
/// CLI values override settings loaded from `spawner.ron`.
#[derive(Parser, Debug)]
#[command(name = "best-spawner", about = "Procedural entity spawning engine")]
pub struct CliArgs {
    /// Ticks between spawn passes.
    #[arg(long)]
    pub ticks_between_spawns: Option<f32>,

    /// Maximum spawns selected per pass.
    #[arg(long)]
    pub max_spawns_per_pass: Option<usize>,

    /// Density cap per chunk.
    #[arg(long)]
    pub max_entities_per_chunk: Option<f32>,

    /// Seed for the spawner's random source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 2_000)]
    pub ticks: u64,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl SpawnerConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ticks) = args.ticks_between_spawns {
            self.scheduling.ticks_between_spawns = ticks;
        }
        if let Some(max) = args.max_spawns_per_pass {
            self.scheduling.max_spawns_per_pass = max;
        }
        if let Some(cap) = args.max_entities_per_chunk {
            self.scheduling.max_entities_per_chunk = cap;
        }
        if let Some(seed) = args.seed {
            self.scheduling.seed = seed;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
