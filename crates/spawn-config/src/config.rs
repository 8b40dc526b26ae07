//! Configuration structs with defaults and RON persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "spawner.ron";

/// Top-level spawner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Spawn pass cadence and population limits.
    pub scheduling: SchedulingConfig,
    /// Zone scanning and position derivation.
    pub zone: ZoneConfig,
    /// Player-relative area spawners.
    pub player: PlayerSpawnerConfig,
    /// Ordered rarity buckets. The first entry is the fallback bucket.
    pub buckets: Vec<BucketConfig>,
    /// Where archetype documents are loaded from.
    pub content: ContentConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// A named rarity tier and its base weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketConfig {
    pub name: String,
    pub weight: f32,
}

impl BucketConfig {
    pub fn new(name: &str, weight: f32) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

/// Scheduling and population limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Countdown reset value after each pass, in ticks.
    pub ticks_between_spawns: f32,
    /// Countdown before a new spawner's first pass, in ticks.
    pub initial_spawn_delay_ticks: f32,
    /// Amount subtracted from the countdown each tick.
    pub tick_timer_multiplier: f32,
    /// Maximum spawn actions selected in a single pass.
    pub max_spawns_per_pass: usize,
    /// Density cap: nearby entities per chunk above which a pass is skipped.
    pub max_entities_per_chunk: f32,
    /// Density cap used by snack spawners.
    pub snack_max_entities_per_chunk: f32,
    /// Minimum separation between spawned entities, in blocks.
    pub minimum_distance_between_entities: f64,
    /// Interval between sweeps of despawned tracked entities, in ticks.
    pub removal_check_ticks: u32,
    /// Seed for the spawner's random source.
    pub seed: u64,
}

/// Zone scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoneConfig {
    /// How far up or down an area spawner may probe for a valid start point.
    pub max_vertical_correction_blocks: i32,
    /// Cap on the measured free space above a position.
    pub max_vertical_space: i32,
    /// Horizontal radius of the nearby-blocks box around a position.
    pub max_nearby_blocks_horizontal_range: i32,
    /// Vertical radius of the nearby-blocks box around a position.
    pub max_nearby_blocks_vertical_range: i32,
    /// Relative weight of each position kind (by name) when the selector
    /// picks which kind to draw from. Unlisted kinds weigh 1.
    pub position_kind_weights: BTreeMap<String, f32>,
}

/// Player spawner region sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerSpawnerConfig {
    /// Whether player spawners are created for connected players.
    pub enabled: bool,
    /// Minimum horizontal distance of a scanned region from the player.
    pub minimum_slice_distance_from_player: f32,
    /// Maximum horizontal distance of a scanned region from the player.
    pub maximum_slice_distance_from_player: f32,
    /// Length and width of a scanned region.
    pub slice_diameter: i32,
    /// Height of a scanned region.
    pub slice_height: i32,
}

/// Content locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory of JSON archetype documents, relative to the config dir.
    pub details_dir: String,
    /// Directory of JSON spawn rule documents, relative to the config dir.
    pub rules_dir: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log every realized spawn at info level.
    pub log_spawns: bool,
}

// --- Default implementations ---

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingConfig::default(),
            zone: ZoneConfig::default(),
            player: PlayerSpawnerConfig::default(),
            buckets: vec![
                BucketConfig::new("common", 94.4),
                BucketConfig::new("uncommon", 5.0),
                BucketConfig::new("rare", 0.5),
                BucketConfig::new("ultra-rare", 0.1),
            ],
            content: ContentConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            ticks_between_spawns: 20.0,
            initial_spawn_delay_ticks: 100.0,
            tick_timer_multiplier: 1.0,
            max_spawns_per_pass: 8,
            max_entities_per_chunk: 1.0,
            snack_max_entities_per_chunk: 2.0,
            minimum_distance_between_entities: 8.0,
            removal_check_ticks: 60,
            seed: 0,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            max_vertical_correction_blocks: 64,
            max_vertical_space: 8,
            max_nearby_blocks_horizontal_range: 4,
            max_nearby_blocks_vertical_range: 2,
            position_kind_weights: BTreeMap::new(),
        }
    }
}

impl Default for PlayerSpawnerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_slice_distance_from_player: 16.0,
            maximum_slice_distance_from_player: 48.0,
            slice_diameter: 8,
            slice_height: 16,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            details_dir: "spawn_details".to_string(),
            rules_dir: "spawn_rules".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_spawns: false,
        }
    }
}

/// Default per-user config directory for the spawner.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("best-spawner"))
}

// --- Validation ---

impl SpawnerConfig {
    /// Checks values serde cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "buckets",
                reason: "at least one bucket is required".to_string(),
            });
        }
        if let Some(bucket) = self.buckets.iter().find(|b| !(b.weight >= 0.0)) {
            return Err(ConfigError::InvalidValue {
                field: "buckets",
                reason: format!("bucket `{}` has negative weight {}", bucket.name, bucket.weight),
            });
        }
        if let Some((kind, weight)) = self
            .zone
            .position_kind_weights
            .iter()
            .find(|(_, w)| !(**w >= 0.0))
        {
            return Err(ConfigError::InvalidValue {
                field: "zone.position_kind_weights",
                reason: format!("kind `{kind}` has negative weight {weight}"),
            });
        }
        if self.scheduling.ticks_between_spawns <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduling.ticks_between_spawns",
                reason: "must be positive".to_string(),
            });
        }
        if self.player.slice_diameter < 1 || self.player.slice_height < 1 {
            return Err(ConfigError::InvalidValue {
                field: "player",
                reason: "slice dimensions must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl SpawnerConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: SpawnerConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded spawner config from {}", config_path.display());
            Ok(config)
        } else {
            let config = SpawnerConfig::default();
            config.save(config_dir)?;
            log::info!("Created default spawner config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `spawner.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: SpawnerConfig =
            ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Spawner config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Directory holding archetype documents for a config rooted at `config_dir`.
    pub fn details_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.content.details_dir)
    }

    /// Directory holding spawn rule documents.
    pub fn rules_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.content.rules_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = SpawnerConfig::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_spawns_per_pass: 8"));
        assert!(ron_str.contains("\"ultra-rare\""));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(scheduling: (max_spawns_per_pass: 3))";
        let config: SpawnerConfig = ron::from_str(ron_str).unwrap();
        assert_eq!(config.scheduling.max_spawns_per_pass, 3);
        assert_eq!(config.scheduling.removal_check_ticks, 60);
        assert_eq!(config.zone, ZoneConfig::default());
        assert_eq!(config.buckets.len(), 4);
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<SpawnerConfig, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SpawnerConfig::default();
        config.scheduling.ticks_between_spawns = 40.0;
        config.buckets = vec![BucketConfig::new("only", 1.0)];

        config.save(dir.path()).unwrap();
        let loaded = SpawnerConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpawnerConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, SpawnerConfig::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpawnerConfig::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());

        let mut modified = config.clone();
        modified.scheduling.max_entities_per_chunk = 2.5;
        modified.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap();
        assert_eq!(
            reloaded.map(|c| c.scheduling.max_entities_per_chunk),
            Some(2.5)
        );
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let mut config = SpawnerConfig::default();
        config.buckets.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "buckets", .. })
        ));
    }

    #[test]
    fn test_negative_bucket_weight_rejected() {
        let mut config = SpawnerConfig::default();
        config.buckets.push(BucketConfig::new("broken", -1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_position_kind_weights_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SpawnerConfig::default();
        config
            .zone
            .position_kind_weights
            .insert("surface".to_string(), 0.25);
        config.save(dir.path()).unwrap();
        let loaded = SpawnerConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(loaded.zone.position_kind_weights.get("surface"), Some(&0.25));

        config
            .zone
            .position_kind_weights
            .insert("grounded".to_string(), -1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "zone.position_kind_weights", .. })
        ));
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let result = SpawnerConfig::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
