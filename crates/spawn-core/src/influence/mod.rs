//! Influences: spatial or temporal modifiers applied during a pass.
//!
//! Every hook on [`SpawningInfluence`] has a neutral default, so an
//! influence implements only what it changes. Influences found while
//! scanning a zone are wrapped in a [`ZoneInfluence`] that scopes them to a
//! radius or to the whole zone; influences owned by a spawner apply to every
//! position it resolves.
//!
//! Influences are shared behind `Arc` and read during a pass. The few that
//! keep consumption state (bites, once-only aspects) use atomics and only
//! change it from [`SpawningInfluence::affect_entity`] and
//! [`SpawningInfluence::on_spawned`], which run once an action is committed.

mod bait;
mod bucket;
mod detector;
mod marker;

pub use bait::{BaitEffectKind, SpawnBaitInfluence};
pub use bucket::{BucketMultiplyingInfluence, BucketNormalizingInfluence};
pub use detector::{
    DetectorRegistry, HoneyLogDetector, IncenseDetector, InfluenceDetector, LureDetector,
    search_range,
};
pub use marker::{HoneyLogInfluence, IncenseInfluence};

use std::fmt::Debug;
use std::sync::Arc;

use rand::RngCore;
use spawn_world::{BlockPos, LivingEntity, WorldQuery};

use crate::action::SpawnAction;
use crate::bucket::SpawnBucket;
use crate::detail::SpawnDetail;
use crate::position::{PositionKind, SpawnablePosition};

/// A modifier consulted at each stage of a pass.
pub trait SpawningInfluence: Send + Sync + Debug {
    /// Expired influences are pruned before the next pass.
    fn is_expired(&self, _game_time: u64) -> bool {
        false
    }

    /// Adjusts bucket weights in place before the bucket draw.
    fn affect_bucket_weights(&self, _weights: &mut [(SpawnBucket, f32)]) {}

    /// Adjusts a detail's weight at a position.
    fn affect_weight(&self, _detail: &SpawnDetail, _position: &SpawnablePosition, weight: f32) -> f32 {
        weight
    }

    /// Returning `false` removes the detail from consideration at this position.
    fn affect_spawnable(&self, _detail: &SpawnDetail, _position: &SpawnablePosition) -> bool {
        true
    }

    /// Extra details offered at a position for the chosen bucket.
    fn injected_details(
        &self,
        _bucket: &SpawnBucket,
        _position: &SpawnablePosition,
    ) -> Vec<Arc<SpawnDetail>> {
        Vec::new()
    }

    /// Whether a position of `kind` may be derived at `pos` at all.
    fn is_allowed_position(&self, _world: &dyn WorldQuery, _pos: BlockPos, _kind: PositionKind) -> bool {
        true
    }

    /// Called once when the influence is attached to a position.
    fn affect_position(&self, _position: &mut SpawnablePosition) {}

    /// Adjusts the realized entity before it is placed. Only runs once no
    /// observer cancelled the action.
    fn affect_entity(&self, _entity: &mut LivingEntity, _rng: &mut dyn RngCore) {}

    /// Called after `action` placed `entity`.
    fn on_spawned(&self, _action: &SpawnAction, _entity: &LivingEntity) {}
}

/// An influence detected in a zone, with its reach.
#[derive(Clone, Debug)]
pub enum ZoneInfluence {
    /// Applies to positions within `radius` blocks of `anchor`.
    Spatial {
        anchor: BlockPos,
        radius: f64,
        influence: Arc<dyn SpawningInfluence>,
    },
    /// Applies to every position in the zone.
    Unconditional(Arc<dyn SpawningInfluence>),
}

impl ZoneInfluence {
    pub fn spatial(anchor: BlockPos, radius: f64, influence: Arc<dyn SpawningInfluence>) -> Self {
        ZoneInfluence::Spatial {
            anchor,
            radius,
            influence,
        }
    }

    pub fn applies_to(&self, pos: BlockPos) -> bool {
        match self {
            ZoneInfluence::Spatial { anchor, radius, .. } => {
                anchor.distance_sq(pos) <= radius * radius
            }
            ZoneInfluence::Unconditional(_) => true,
        }
    }

    pub fn influence(&self) -> &Arc<dyn SpawningInfluence> {
        match self {
            ZoneInfluence::Spatial { influence, .. } | ZoneInfluence::Unconditional(influence) => {
                influence
            }
        }
    }
}

/// Drops expired influences. Returns how many were removed.
pub fn prune_expired(influences: &mut Vec<Arc<dyn SpawningInfluence>>, game_time: u64) -> usize {
    let before = influences.len();
    influences.retain(|influence| !influence.is_expired(game_time));
    before - influences.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ExpiresAt(u64);

    impl SpawningInfluence for ExpiresAt {
        fn is_expired(&self, game_time: u64) -> bool {
            game_time >= self.0
        }
    }

    #[test]
    fn test_spatial_reach_is_inclusive() {
        let zi = ZoneInfluence::spatial(BlockPos::new(0, 0, 0), 5.0, Arc::new(ExpiresAt(0)));
        assert!(zi.applies_to(BlockPos::new(3, 0, 4)));
        assert!(!zi.applies_to(BlockPos::new(4, 0, 4)));
        assert!(ZoneInfluence::Unconditional(Arc::new(ExpiresAt(0))).applies_to(BlockPos::new(999, 0, 0)));
    }

    #[test]
    fn test_prune_expired() {
        let mut influences: Vec<Arc<dyn SpawningInfluence>> =
            vec![Arc::new(ExpiresAt(10)), Arc::new(ExpiresAt(100))];
        assert_eq!(prune_expired(&mut influences, 50), 1);
        assert_eq!(influences.len(), 1);
        assert!(!influences[0].is_expired(50));
    }
}
