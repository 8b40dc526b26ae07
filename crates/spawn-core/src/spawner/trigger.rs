//! Spawners fired on demand for a single position.

use std::sync::Arc;

use spawn_config::ZoneConfig;
use spawn_world::{BaitEffect, BlockId, BlockPos, EntityId, WorldMut, WorldQuery};
use tracing::debug;

use super::Spawner;
use crate::action::{EntitySpawnResult, SpawnAction};
use crate::cause::{FishingCast, SpawnCause};
use crate::engine::BestSpawner;
use crate::influence::{BucketNormalizingInfluence, SpawnBaitInfluence, SpawningInfluence, prune_expired};
use crate::position::{Environment, FishingInfo, PositionData, SpawnablePosition};

/// Runs when something outside the schedule asks for a spawn, such as a
/// fishing bobber getting a bite. Each call selects at most one action.
#[derive(Debug)]
pub struct TriggerSpawner {
    name: String,
    pub influences: Vec<Arc<dyn SpawningInfluence>>,
    /// Entities placed by this spawner.
    pub spawned: Vec<EntityId>,
}

impl TriggerSpawner {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            influences: Vec::new(),
            spawned: Vec::new(),
        }
    }

    /// The fishing position at `pos`, which must be a loaded fluid block.
    pub fn fishing_position(
        world: &dyn WorldQuery,
        cause: Arc<SpawnCause>,
        pos: BlockPos,
        zone: &ZoneConfig,
    ) -> Option<SpawnablePosition> {
        let cast = cause.fishing.clone()?;
        if !world.is_chunk_loaded(pos.chunk()) {
            return None;
        }
        let fluid_block = world.block(pos);
        world.blocks().fluid(fluid_block)?;

        let horizontal = zone.max_nearby_blocks_horizontal_range;
        let vertical = zone.max_nearby_blocks_vertical_range;
        let mut nearby_blocks: Vec<BlockId> = Vec::new();
        for dx in -horizontal..=horizontal {
            for dy in -vertical..=vertical {
                for dz in -horizontal..=horizontal {
                    let at = pos.offset(dx, dy, dz);
                    if !world.is_chunk_loaded(at.chunk()) {
                        continue;
                    }
                    let block = world.block(at);
                    if !nearby_blocks.contains(&block) {
                        nearby_blocks.push(block);
                    }
                }
            }
        }
        nearby_blocks.sort();

        Some(SpawnablePosition::new(
            cause,
            Arc::new(Environment::capture(world)),
            pos,
            world.biome(pos),
            world.light(pos),
            world.sky_light(pos),
            world.can_see_sky(pos),
            Vec::new(),
            PositionData::Fishing(FishingInfo {
                cast,
                fluid_block,
                nearby_blocks,
            }),
        ))
    }

    /// Chooses what would bite at `pos` without spawning it.
    pub fn spawn_action(
        &mut self,
        engine: &mut BestSpawner,
        world: &dyn WorldQuery,
        angler: Option<EntityId>,
        cast: FishingCast,
        pos: BlockPos,
        extra: Vec<Arc<dyn SpawningInfluence>>,
    ) -> Option<SpawnAction> {
        prune_expired(&mut self.influences, world.game_time());
        let cause = Arc::new(SpawnCause::new(&self.name, angler).with_fishing(cast));
        let Some(mut position) =
            Self::fishing_position(world, Arc::clone(&cause), pos, &engine.config().zone)
        else {
            debug!("{}: no fluid at {pos:?}", self.name);
            return None;
        };
        for influence in self.influences.iter().cloned().chain(extra) {
            position.attach_influence(influence);
        }
        let influences = position.influences.clone();
        let bucket = engine.choose_bucket(&cause, &influences)?;
        engine.select(&bucket, vec![position], 1, world).into_iter().next()
    }

    /// A bite at `pos`: the bait's effects apply to whatever is drawn.
    pub fn cast(
        &mut self,
        engine: &mut BestSpawner,
        world: &mut dyn WorldMut,
        angler: Option<EntityId>,
        cast: FishingCast,
        pos: BlockPos,
        bait: Vec<BaitEffect>,
    ) -> Option<EntitySpawnResult> {
        let mut extra: Vec<Arc<dyn SpawningInfluence>> = Vec::new();
        let tier = SpawnBaitInfluence::rarity_tier(&bait);
        if tier > 0 {
            extra.push(Arc::new(BucketNormalizingInfluence::new(tier)));
        }
        extra.push(Arc::new(SpawnBaitInfluence::new(bait).at(pos)));

        let action = self.spawn_action(engine, world, angler, cast, pos, extra)?;
        let result = engine.execute(world, &action)?;
        self.after_spawn(world, &action, &result);
        Some(result)
    }
}

impl Spawner for TriggerSpawner {
    fn name(&self) -> &str {
        &self.name
    }

    fn influences(&self) -> &[Arc<dyn SpawningInfluence>] {
        &self.influences
    }

    fn influences_mut(&mut self) -> &mut Vec<Arc<dyn SpawningInfluence>> {
        &mut self.influences
    }

    /// Trigger spawns skip the density check.
    fn max_entities_per_chunk(&self) -> f32 {
        0.0
    }

    fn after_spawn(&mut self, _world: &mut dyn WorldMut, _action: &SpawnAction, result: &EntitySpawnResult) {
        self.spawned.extend(result.entities.iter().map(|e| e.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionKind;
    use crate::spawner::test_support::engine;
    use crate::test_world::{FlatWorld, flat_world};
    use serde_json::json;

    fn pond() -> (spawn_world::GridWorld, BestSpawner) {
        let FlatWorld { mut world, water, .. } = flat_world(10);
        world.fill(BlockPos::new(2, 7, 2), BlockPos::new(6, 9, 6), water);
        let mut engine = engine();
        engine
            .load_detail_value(
                &json!([
                    {
                        "id": "carp", "entity": "carp", "position_type": "fishing",
                        "bucket": "common", "weight": 1.0, "level": "5-5",
                        "conditions": [{"rod": "basic_rod"}]
                    },
                    {
                        "id": "eel", "entity": "eel", "position_type": "fishing",
                        "bucket": "common", "weight": 1.0,
                        "conditions": [{"rod": "deep_rod"}]
                    }
                ]),
                None,
            )
            .unwrap();
        (world, engine)
    }

    fn rod(name: &str) -> FishingCast {
        FishingCast {
            rod: name.to_string(),
            ..FishingCast::default()
        }
    }

    #[test]
    fn test_fishing_position_needs_fluid() {
        let (world, engine) = pond();
        let cause = Arc::new(SpawnCause::new("rod", None).with_fishing(rod("basic_rod")));
        let zone = &engine.config().zone;
        let position = TriggerSpawner::fishing_position(&world, cause.clone(), BlockPos::new(4, 9, 4), zone)
            .unwrap();
        assert_eq!(position.kind(), PositionKind::Fishing);
        assert!(position.nearby_blocks().len() >= 2);
        assert!(TriggerSpawner::fishing_position(&world, cause, BlockPos::new(20, 9, 20), zone).is_none());

        let dry = Arc::new(SpawnCause::new("rod", None));
        assert!(TriggerSpawner::fishing_position(&world, dry, BlockPos::new(4, 9, 4), zone).is_none());
    }

    #[test]
    fn test_cast_spawns_one_matching_entity() {
        let (mut world, mut engine) = pond();
        let mut spawner = TriggerSpawner::new("rod");
        for _ in 0..5 {
            let result = spawner
                .cast(&mut engine, &mut world, None, rod("basic_rod"), BlockPos::new(4, 9, 4), Vec::new())
                .unwrap();
            assert_eq!(result.entities.len(), 1);
            assert_eq!(result.entities[0].entity_type, "carp");
            assert_eq!(result.entities[0].level, 5);
        }
        assert_eq!(spawner.spawned.len(), 5);
        assert!(
            spawner
                .cast(&mut engine, &mut world, None, rod("old_rod"), BlockPos::new(4, 9, 4), Vec::new())
                .is_none()
        );
    }

    #[test]
    fn test_bait_effects_apply_to_catch() {
        let (mut world, mut engine) = pond();
        let mut spawner = TriggerSpawner::new("rod");
        let bait = vec![BaitEffect {
            kind: "level".to_string(),
            subcategory: None,
            value: 3.0,
            chance: 1.0,
        }];
        let result = spawner
            .cast(&mut engine, &mut world, None, rod("basic_rod"), BlockPos::new(4, 9, 4), bait)
            .unwrap();
        assert_eq!(result.entities[0].level, 8);
    }
}
