//! Spawn details: named archetypes with conditions, weights and a bucket.
//!
//! A detail decides *whether* it can spawn at a position (conditions,
//! anticonditions and an optional composite tree), *how likely* it is there
//! (base weight, weight multipliers, influences) and *what* the spawn is
//! (its [`DetailKind`]). Details are built by the [`DetailLoader`] and shared
//! behind `Arc` once they are in a [`SpawnPool`].

mod entity;
mod herd;
mod loader;
mod pool;

pub use entity::{
    DEFAULT_LEVEL_RANGE, EntitySpawn, LevelRange, PossibleHeldItem, roll_held_item,
};
pub use herd::{HERD_LEADER, HerdSpawn, Herdable};
pub use loader::{DetailLoader, DetailParser, DetailTypeRegistry};
pub(crate) use loader::collect_json_files;
pub use pool::SpawnPool;

use std::sync::Arc;

use rand::RngCore;
use spawn_world::{BiomeRegistry, WorldQuery};

use crate::action::SpawnAction;
use crate::bucket::SpawnBucket;
use crate::condition::{CompositeCondition, SpawningCondition};
use crate::error::LoadError;
use crate::position::{PositionKind, SpawnablePosition};
use crate::selector::SelectionState;

/// What a detail spawns.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailKind {
    Entity(EntitySpawn),
    Herd(HerdSpawn),
}

/// Scales a detail's weight where its conditions hold.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightMultiplier {
    pub multiplier: f32,
    pub conditions: Vec<SpawningCondition>,
    pub anticonditions: Vec<SpawningCondition>,
}

impl WeightMultiplier {
    pub fn applies_to(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        (self.conditions.is_empty()
            || self.conditions.iter().any(|c| c.is_satisfied_by(position, world)))
            && !self
                .anticonditions
                .iter()
                .any(|c| c.is_satisfied_by(position, world))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnDetail {
    pub id: String,
    /// Registered type name the detail was parsed with.
    pub detail_type: String,
    pub position_type: PositionKind,
    pub bucket: String,
    /// Any one must hold; an empty list always holds.
    pub conditions: Vec<SpawningCondition>,
    /// None may hold.
    pub anticonditions: Vec<SpawningCondition>,
    pub composite: Option<CompositeCondition>,
    pub weight_multipliers: Vec<WeightMultiplier>,
    pub weight: f32,
    /// Details with a percentage are drawn before weighted ones.
    pub percentage: Option<f32>,
    pub labels: Vec<String>,
    pub kind: DetailKind,
}

impl SpawnDetail {
    pub fn is_percentage(&self) -> bool {
        self.percentage.is_some_and(|p| p > 0.0)
    }

    pub fn percentage_or_zero(&self) -> f32 {
        self.percentage.filter(|p| *p > 0.0).unwrap_or(0.0)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Kind match, then any condition, then no anticondition, then the
    /// composite tree.
    pub fn is_satisfied_by(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        if position.kind() != self.position_type {
            return false;
        }
        if !self.conditions.is_empty()
            && !self
                .conditions
                .iter()
                .any(|c| c.is_satisfied_by(position, world))
        {
            return false;
        }
        if self
            .anticonditions
            .iter()
            .any(|c| c.is_satisfied_by(position, world))
        {
            return false;
        }
        self.composite
            .as_ref()
            .is_none_or(|composite| composite.is_satisfied_by(position, world))
    }

    /// Weight at `position`: base weight, applicable multipliers, then every
    /// influence attached to the position. Never negative.
    pub fn weight_for(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> f32 {
        let mut weight = self.weight;
        for multiplier in &self.weight_multipliers {
            if multiplier.applies_to(position, world) {
                weight *= multiplier.multiplier;
            }
        }
        for influence in &position.influences {
            weight = influence.affect_weight(self, position, weight);
        }
        if weight > 0.0 { weight } else { 0.0 }
    }

    /// Pre-resolves biome patterns in every condition.
    pub fn resolve_biomes(&mut self, biomes: &BiomeRegistry) {
        let conditions = self
            .conditions
            .iter_mut()
            .chain(self.anticonditions.iter_mut())
            .chain(
                self.weight_multipliers
                    .iter_mut()
                    .flat_map(|m| m.conditions.iter_mut().chain(m.anticonditions.iter_mut())),
            );
        for condition in conditions {
            condition.resolve_biomes(biomes);
        }
        if let Some(composite) = &mut self.composite {
            composite.for_each_condition_mut(&mut |c| c.resolve_biomes(biomes));
        }
    }

    /// Checks what the document format cannot express.
    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::InvalidDetail {
            id: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id is empty".to_string()));
        }
        if !(self.weight >= 0.0) {
            return Err(invalid(format!("weight {} is negative", self.weight)));
        }
        if let Some(percentage) = self.percentage
            && !(0.0..=100.0).contains(&percentage)
        {
            return Err(invalid(format!("percentage {percentage} is outside 0-100")));
        }
        if let Some(m) = self.weight_multipliers.iter().find(|m| !(m.multiplier >= 0.0)) {
            return Err(invalid(format!("weight multiplier {} is negative", m.multiplier)));
        }
        match &self.kind {
            DetailKind::Entity(entity) => entity.validate(),
            DetailKind::Herd(herd) => herd.validate(),
        }
        .map_err(invalid)
    }

    fn herd_level_key(&self) -> String {
        format!("{}__LEVEL", self.id)
    }

    /// How many of each herd member the pass already holds, plus `extra`.
    fn herd_counts(
        self: &Arc<Self>,
        herd: &HerdSpawn,
        state: &SelectionState,
        extra: Option<&SpawnAction>,
    ) -> Vec<u32> {
        let mut counts = vec![0; herd.members.len()];
        for action in state.actions_of(self).chain(extra) {
            if let Some(member) = action.herd_member
                && let Some(count) = counts.get_mut(member)
            {
                *count += 1;
            }
        }
        counts
    }

    /// Builds the action for spawning at `position`. A herd with no member
    /// left to offer yields `None`.
    pub(crate) fn create_action(
        self: &Arc<Self>,
        position: &SpawnablePosition,
        bucket: &SpawnBucket,
        state: &mut SelectionState,
        rng: &mut dyn RngCore,
    ) -> Option<SpawnAction> {
        match &self.kind {
            DetailKind::Entity(entity) => Some(SpawnAction {
                position: position.clone(),
                bucket: bucket.clone(),
                detail: Arc::clone(self),
                entity_type: entity.entity_type.clone(),
                level_range: entity.level_range(),
                held_item: roll_held_item(&entity.held_items, rng),
                drops: entity.drops.clone(),
                labels: Vec::new(),
                herd_member: None,
            }),
            DetailKind::Herd(herd) => {
                let level = state.context_level(&self.herd_level_key(), herd.level, rng);
                let counts = self.herd_counts(herd, state, None);
                let index = herd.pick_member(level, &counts, rng)?;
                let member = &herd.members[index];
                let mut labels = Vec::new();
                if member.is_leader {
                    labels.push(HERD_LEADER.to_string());
                }
                Some(SpawnAction {
                    position: position.clone(),
                    bucket: bucket.clone(),
                    detail: Arc::clone(self),
                    entity_type: member.entity_type.clone(),
                    level_range: herd.member_level_range(index, level),
                    held_item: None,
                    drops: member.drop_table.clone(),
                    labels,
                    herd_member: Some(index),
                })
            }
        }
    }

    /// Updates the selection after `action` was chosen from this detail.
    ///
    /// Ordinary details clear positions within the minimum entity spacing.
    /// A herd claims the pass: every other detail is dropped, positions
    /// within the herd spacing are cleared, and the herd itself is dropped
    /// once it is full or no member can join.
    pub(crate) fn on_selection(self: &Arc<Self>, action: &SpawnAction, state: &mut SelectionState) {
        match &self.kind {
            DetailKind::Entity(_) => {
                let spacing = state.minimum_distance();
                state.remove_positions(|_, p| p.distance_to(&action.position) < spacing);
            }
            DetailKind::Herd(herd) => {
                state.remove_details(|d| !std::ptr::eq(d, self.as_ref()));
                let spacing = herd.min_distance_between_spawns;
                state.remove_positions(|_, p| p.distance_to(&action.position) < spacing);

                let herd_size = state.actions_of(self).count() + 1;
                let level = state
                    .cached_level(&self.herd_level_key())
                    .unwrap_or(herd.level.min);
                let counts = self.herd_counts(herd, state, Some(action));
                if herd_size >= herd.max_herd_size || herd.eligible_members(level, &counts).is_empty()
                {
                    state.remove_details(|d| std::ptr::eq(d, self.as_ref()));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::condition::ConditionRegistry;
    use serde_json::Value;

    /// Parses a detail document against the default registries and buckets
    /// `common` and `rare`.
    pub fn detail(value: Value) -> Arc<SpawnDetail> {
        let conditions = ConditionRegistry::with_defaults();
        let types = DetailTypeRegistry::with_defaults();
        let buckets = vec![SpawnBucket::new("common", 90.0), SpawnBucket::new("rare", 10.0)];
        let loader = DetailLoader::new(&conditions, &types, &buckets);
        Arc::new(loader.parse_detail(&value).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::detail;
    use super::*;
    use crate::position::test_support::{grounded_at, with_data};
    use crate::position::{AreaInfo, FluidInfo, PositionData};
    use crate::test_world::{flat_world, FlatWorld};
    use serde_json::json;
    use spawn_world::{BlockId, BlockPos};

    fn surface_at(pos: BlockPos) -> SpawnablePosition {
        with_data(
            pos,
            PositionData::Surface(
                AreaInfo {
                    base_block: BlockId(3),
                    height: 4,
                    nearby_blocks: vec![BlockId(3)],
                },
                FluidInfo {
                    fluid_block: BlockId(3),
                    is_source: true,
                    depth: 2,
                },
            ),
        )
    }

    #[test]
    fn test_conditionless_matches_own_kind_only() {
        let FlatWorld { world, .. } = flat_world(10);
        let rabbit = detail(json!({
            "id": "rabbit", "entity": "rabbit", "position_type": "grounded", "bucket": "common", "weight": 1.0
        }));
        assert!(rabbit.is_satisfied_by(&grounded_at(BlockPos::new(0, 9, 0), 4), &world));
        assert!(!rabbit.is_satisfied_by(&surface_at(BlockPos::new(0, 9, 0)), &world));
    }

    #[test]
    fn test_any_condition_no_anticondition() {
        let FlatWorld { world, .. } = flat_world(10);
        let goat = detail(json!({
            "id": "goat", "entity": "goat", "position_type": "grounded", "bucket": "common", "weight": 1.0,
            "conditions": [{"min_y": 100}, {"max_y": 20}],
            "anticonditions": [{"min_height": 5}]
        }));
        assert!(goat.is_satisfied_by(&grounded_at(BlockPos::new(0, 9, 0), 4), &world));
        assert!(!goat.is_satisfied_by(&grounded_at(BlockPos::new(0, 50, 0), 4), &world));
        assert!(!goat.is_satisfied_by(&grounded_at(BlockPos::new(0, 9, 0), 6), &world));
    }

    #[test]
    fn test_weight_multipliers_apply_when_satisfied() {
        let FlatWorld { world, .. } = flat_world(10);
        let owl = detail(json!({
            "id": "owl", "entity": "owl", "position_type": "grounded", "bucket": "common", "weight": 2.0,
            "weight_multipliers": [
                {"multiplier": 3.0, "conditions": [{"max_y": 20}]},
                {"multiplier": 10.0, "conditions": [{"min_y": 100}]}
            ]
        }));
        assert_eq!(owl.weight_for(&grounded_at(BlockPos::new(0, 9, 0), 4), &world), 6.0);
        assert_eq!(owl.weight_for(&grounded_at(BlockPos::new(0, 150, 0), 4), &world), 20.0);
    }

    #[test]
    fn test_labelled_weight_boosted_by_influence() {
        let FlatWorld { world, .. } = flat_world(10);
        let ember = detail(json!({
            "id": "ember", "entity": "salamander", "position_type": "grounded", "bucket": "common",
            "weight": 2.0, "labels": ["fire"]
        }));
        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        position.attach_influence(Arc::new(crate::influence::IncenseInfluence {
            labels: vec!["fire".to_string()],
            multiplier: 4.0,
            expires_at: None,
        }));
        assert_eq!(ember.weight_for(&position, &world), 8.0);
    }

    #[test]
    fn test_validation_rejects_bad_percentage() {
        let mut bad = (*detail(json!({
            "id": "x", "entity": "x", "position_type": "grounded", "bucket": "common", "weight": 1.0
        })))
        .clone();
        bad.percentage = Some(120.0);
        assert!(matches!(bad.validate(), Err(LoadError::InvalidDetail { .. })));
    }
}
