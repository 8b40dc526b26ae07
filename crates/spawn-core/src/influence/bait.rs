//! Bait: consumable effects from lures, snacks and fishing bait.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rand::{Rng, RngCore};
use spawn_world::{BaitEffect, BlockPos, LivingEntity};

use super::SpawningInfluence;
use crate::action::SpawnAction;
use crate::detail::SpawnDetail;
use crate::position::SpawnablePosition;

/// Effect kinds the spawner understands. Unknown kinds are carried but inert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaitEffectKind {
    /// Lure tier; drives bucket normalization.
    RarityBucket,
    /// Weight multiplier for details carrying the `subcategory` label.
    Label,
    /// Adds `value` levels to the spawned entity.
    Level,
    /// Adds the `subcategory` aspect to the spawned entity.
    Aspect,
    /// Shortens the time between bites by `value` (a fraction).
    BiteTime,
    Other(String),
}

impl BaitEffectKind {
    pub fn of(effect: &BaitEffect) -> Self {
        match effect.kind.as_str() {
            "rarity_bucket" => BaitEffectKind::RarityBucket,
            "label" => BaitEffectKind::Label,
            "level" => BaitEffectKind::Level,
            "aspect" => BaitEffectKind::Aspect,
            "bite_time" => BaitEffectKind::BiteTime,
            other => BaitEffectKind::Other(other.to_string()),
        }
    }
}

/// Applies a bait's effects and counts bites.
///
/// An effect that fires on a spawned entity marks the bait as used. Once
/// the entity is placed, the bite counter advances if an effect fired or a
/// label effect drew the detail in, and the flag resets. Nothing is counted
/// for actions that never get placed. With `max_bites` set, the bait
/// expires once it is eaten through.
#[derive(Debug)]
pub struct SpawnBaitInfluence {
    pub effects: Vec<BaitEffect>,
    pub anchor: Option<BlockPos>,
    pub max_bites: Option<u32>,
    used: AtomicBool,
    bites: AtomicU32,
}

impl SpawnBaitInfluence {
    pub fn new(effects: Vec<BaitEffect>) -> Self {
        Self {
            effects,
            anchor: None,
            max_bites: None,
            used: AtomicBool::new(false),
            bites: AtomicU32::new(0),
        }
    }

    pub fn at(mut self, anchor: BlockPos) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_max_bites(mut self, max_bites: u32) -> Self {
        self.max_bites = Some(max_bites);
        self
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    pub fn bites(&self) -> u32 {
        self.bites.load(Ordering::Relaxed)
    }

    fn mark_used(&self) {
        self.used.store(true, Ordering::Relaxed);
    }

    /// Whether a label effect draws in `detail`.
    fn attracts(&self, detail: &SpawnDetail) -> bool {
        self.effects_of(BaitEffectKind::Label).any(|effect| {
            effect
                .subcategory
                .as_ref()
                .is_some_and(|label| detail.labels.contains(label))
        })
    }

    fn effects_of(&self, kind: BaitEffectKind) -> impl Iterator<Item = &BaitEffect> {
        self.effects
            .iter()
            .filter(move |effect| BaitEffectKind::of(effect) == kind)
    }

    /// Highest lure tier among the effects, or 0.
    pub fn rarity_tier(effects: &[BaitEffect]) -> u32 {
        effects
            .iter()
            .filter(|e| BaitEffectKind::of(e) == BaitEffectKind::RarityBucket)
            .map(|e| e.value.max(0.0) as u32)
            .max()
            .unwrap_or(0)
    }

    /// Multiplier applied to the base time between bites. Picks one
    /// bite-time effect at random; it only applies if its chance roll passes.
    pub fn bite_time_multiplier(&self, rng: &mut dyn RngCore) -> f32 {
        let candidates: Vec<&BaitEffect> = self.effects_of(BaitEffectKind::BiteTime).collect();
        if candidates.is_empty() {
            return 1.0;
        }
        let effect = candidates[rng.random_range(0..candidates.len())];
        if rng.random::<f64>() > effect.chance {
            return 1.0;
        }
        (1.0 - effect.value as f32).max(0.0)
    }
}

impl SpawningInfluence for SpawnBaitInfluence {
    fn is_expired(&self, _game_time: u64) -> bool {
        self.max_bites.is_some_and(|max| self.bites() >= max)
    }

    fn affect_weight(&self, detail: &SpawnDetail, _position: &SpawnablePosition, weight: f32) -> f32 {
        self.effects_of(BaitEffectKind::Label)
            .filter(|effect| {
                effect
                    .subcategory
                    .as_ref()
                    .is_some_and(|label| detail.labels.contains(label))
            })
            .fold(weight, |w, effect| w * effect.value as f32)
    }

    fn affect_entity(&self, entity: &mut LivingEntity, rng: &mut dyn RngCore) {
        for effect in &self.effects {
            if rng.random::<f64>() > effect.chance {
                continue;
            }
            match BaitEffectKind::of(effect) {
                BaitEffectKind::Level => {
                    entity.level = entity.level.saturating_add(effect.value.max(0.0) as u32);
                    self.mark_used();
                }
                BaitEffectKind::Aspect => {
                    if let Some(aspect) = &effect.subcategory
                        && !entity.aspects.contains(aspect)
                    {
                        entity.aspects.push(aspect.clone());
                    }
                    self.mark_used();
                }
                _ => {}
            }
        }
    }

    fn on_spawned(&self, action: &SpawnAction, _entity: &LivingEntity) {
        let fired = self.used.swap(false, Ordering::Relaxed);
        if fired || self.attracts(&action.detail) {
            self.bites.fetch_add(1, Ordering::Relaxed);
        }
    }
}
