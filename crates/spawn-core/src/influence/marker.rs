//! Influences from placed blocks: honeyed logs and incense.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::RngCore;
use spawn_world::{BlockPos, LivingEntity};

use super::SpawningInfluence;
use crate::detail::SpawnDetail;
use crate::position::SpawnablePosition;

pub const HONEY_LOG_MARKER: &str = "honey_log";
pub const HONEY_DRENCHED_ASPECT: &str = "honey_drenched";

/// Marks positions near a honeyed log; the first entity spawned through it
/// comes out honey-drenched.
#[derive(Debug)]
pub struct HoneyLogInfluence {
    pub log: BlockPos,
    activated: AtomicBool,
}

impl HoneyLogInfluence {
    pub fn new(log: BlockPos) -> Self {
        Self {
            log,
            activated: AtomicBool::new(false),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Relaxed)
    }
}

impl SpawningInfluence for HoneyLogInfluence {
    fn affect_position(&self, position: &mut SpawnablePosition) {
        if !position.markers.iter().any(|m| m == HONEY_LOG_MARKER) {
            position.markers.push(HONEY_LOG_MARKER.to_string());
        }
    }

    fn affect_entity(&self, entity: &mut LivingEntity, _rng: &mut dyn RngCore) {
        if !self.activated.swap(true, Ordering::Relaxed) {
            entity.aspects.push(HONEY_DRENCHED_ASPECT.to_string());
        }
    }
}

/// Boosts details carrying any of the incense's labels.
#[derive(Clone, Debug, PartialEq)]
pub struct IncenseInfluence {
    pub labels: Vec<String>,
    pub multiplier: f32,
    /// Game tick at which the incense burns out.
    pub expires_at: Option<u64>,
}

impl SpawningInfluence for IncenseInfluence {
    fn is_expired(&self, game_time: u64) -> bool {
        self.expires_at.is_some_and(|tick| game_time >= tick)
    }

    fn affect_weight(&self, detail: &SpawnDetail, _position: &SpawnablePosition, weight: f32) -> f32 {
        if detail.labels.iter().any(|label| self.labels.contains(label)) {
            weight * self.multiplier
        } else {
            weight
        }
    }
}
