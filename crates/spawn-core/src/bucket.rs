//! Rarity buckets: stage one of the two-stage selection.

use serde::{Deserialize, Serialize};
use spawn_config::BucketConfig;

/// A named rarity tier with its configured base weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnBucket {
    pub name: String,
    pub weight: f32,
}

impl SpawnBucket {
    pub fn new(name: &str, weight: f32) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

impl From<&BucketConfig> for SpawnBucket {
    fn from(config: &BucketConfig) -> Self {
        Self::new(&config.name, config.weight.max(0.0))
    }
}

/// Builds the ordered bucket list from configuration.
pub fn buckets_from_config(configs: &[BucketConfig]) -> Vec<SpawnBucket> {
    configs.iter().map(SpawnBucket::from).collect()
}

/// Starting weights for an influence pass: each bucket paired with its base weight.
pub fn base_weights(buckets: &[SpawnBucket]) -> Vec<(SpawnBucket, f32)> {
    buckets.iter().map(|b| (b.clone(), b.weight)).collect()
}
