//! Procedural entity spawning.
//!
//! A pass runs in four stages: snapshot a cuboid of the world into a
//! [`SpawningZone`], resolve every [`SpawnablePosition`] in it, draw a
//! [`SpawnBucket`], then select [`SpawnAction`]s from the loaded
//! [`SpawnDetail`]s whose conditions hold. [`BestSpawner`] owns the content
//! and registries; the spawners in [`spawner`] decide when and where passes
//! run.

pub mod action;
pub mod bucket;
pub mod cause;
pub mod condition;
pub mod detail;
pub mod engine;
pub mod error;
pub mod influence;
pub mod position;
pub mod rules;
pub mod selector;
pub mod spawner;
pub mod weighted;
pub mod zone;

#[cfg(test)]
mod test_world;

pub use action::{
    EntitySpawnResult, SeasonResolver, SpawnAction, SpawnDecision, SpawnHooks, SpawnObserver,
};
pub use bucket::SpawnBucket;
pub use cause::{FishingCast, SpawnCause};
pub use condition::{CompositeCondition, ConditionRegistry, SpawningCondition};
pub use detail::{DetailLoader, DetailTypeRegistry, SpawnDetail, SpawnPool};
pub use engine::BestSpawner;
pub use error::{LoadError, ZoneError};
pub use influence::{SpawningInfluence, ZoneInfluence};
pub use position::{PositionKind, SpawnablePosition};
pub use rules::{SpawnRule, load_rules_dir, load_rules_value};
pub use selector::SpawningSelector;
pub use spawner::{
    FixedAreaSpawner, PlayerSpawner, SnackSpawner, Spawner, SpawnerManager, TickingSpawner,
    TriggerSpawner,
};
pub use zone::{SpawningZone, ZoneGenerator, ZoneInput};
