//! The context threaded through a spawn pass.

use spawn_world::EntityId;

use crate::bucket::SpawnBucket;

/// Why a pass is running: which spawner, the bucket once chosen, and the
/// entity that caused it, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnCause {
    pub spawner: String,
    pub bucket: Option<SpawnBucket>,
    pub entity: Option<EntityId>,
    /// Present for passes triggered by a fishing cast.
    pub fishing: Option<FishingCast>,
}

impl SpawnCause {
    pub fn new(spawner: &str, entity: Option<EntityId>) -> Self {
        Self {
            spawner: spawner.to_string(),
            bucket: None,
            entity,
            fishing: None,
        }
    }

    pub fn with_bucket(mut self, bucket: SpawnBucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn with_fishing(mut self, cast: FishingCast) -> Self {
        self.fishing = Some(cast);
        self
    }
}

/// The rod and bait used for a fishing-triggered pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FishingCast {
    /// Rod item name.
    pub rod: String,
    /// Rod variant (e.g. the ball type fitted to it).
    pub rod_type: Option<String>,
    /// Lure enchantment level.
    pub lure_level: u8,
    /// Bait item on the hook.
    pub bait: Option<String>,
}
