//! Spawners around a placed snack bait.

use std::sync::Arc;

use rand::RngCore;
use spawn_config::SchedulingConfig;
use spawn_world::{BaitEffect, BlockPos, WorldMut, WorldQuery};

use super::{Spawner, TickingSpawner, TickingState, run_area_pass};
use crate::action::{EntitySpawnResult, SpawnAction};
use crate::cause::SpawnCause;
use crate::engine::BestSpawner;
use crate::influence::{
    BucketMultiplyingInfluence, BucketNormalizingInfluence, SpawnBaitInfluence, SpawningInfluence,
};
use crate::zone::ZoneInput;

/// Horizontal and vertical reach of a snack, in blocks.
pub const SNACK_RADIUS: i32 = 8;

/// Aspect given to everything a snack attracts.
pub const SNACK_CRUMBED_ASPECT: &str = "snack_crumbed";

const BASE_TICKS_BETWEEN_BITES: f32 = 4.0;

/// Rarer buckets are favoured near a snack.
const SNACK_BUCKET_MULTIPLIERS: [(&str, f32); 3] =
    [("uncommon", 2.25), ("rare", 5.5), ("ultra-rare", 5.5)];

/// Spawns one entity per pass around a snack until it is eaten.
#[derive(Debug)]
pub struct SnackSpawner {
    pub state: TickingState,
    pub position: BlockPos,
    /// Bites left before the snack is gone.
    pub bites_left: u32,
    bait: Arc<SpawnBaitInfluence>,
}

impl SnackSpawner {
    pub fn new(
        name: &str,
        position: BlockPos,
        effects: Vec<BaitEffect>,
        bites: u32,
        scheduling: &SchedulingConfig,
        rng: &mut dyn RngCore,
    ) -> Self {
        let mut state = TickingState::new(name, scheduling);
        state.max_entities_per_chunk = scheduling.snack_max_entities_per_chunk;

        let tier = SpawnBaitInfluence::rarity_tier(&effects);
        if tier > 0 {
            state
                .influences
                .push(Arc::new(BucketNormalizingInfluence::new(tier)));
        }
        state
            .influences
            .push(Arc::new(BucketMultiplyingInfluence::new(&SNACK_BUCKET_MULTIPLIERS)));
        let bait = Arc::new(SpawnBaitInfluence::new(effects).at(position));
        state.influences.push(bait.clone());

        let mut spawner = Self {
            state,
            position,
            bites_left: bites,
            bait,
        };
        spawner.state.ticks_until_next_spawn = spawner.ticks_until_next_bite(rng);
        spawner
    }

    /// Four ticks scaled by the bait's bite time, never below one.
    pub fn ticks_until_next_bite(&self, rng: &mut dyn RngCore) -> f32 {
        (BASE_TICKS_BETWEEN_BITES * self.bait.bite_time_multiplier(rng)).max(1.0)
    }

    fn zone_input(&self) -> ZoneInput {
        let span = SNACK_RADIUS * 2 + 1;
        ZoneInput::new(
            self.position.offset(-SNACK_RADIUS, -SNACK_RADIUS, -SNACK_RADIUS),
            span,
            span,
            span,
        )
    }
}

impl Spawner for SnackSpawner {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn influences(&self) -> &[Arc<dyn SpawningInfluence>] {
        &self.state.influences
    }

    fn influences_mut(&mut self) -> &mut Vec<Arc<dyn SpawningInfluence>> {
        &mut self.state.influences
    }

    fn max_entities_per_chunk(&self) -> f32 {
        self.state.max_entities_per_chunk
    }

    fn after_spawn(&mut self, world: &mut dyn WorldMut, _action: &SpawnAction, result: &EntitySpawnResult) {
        for entity in &result.entities {
            if let Some(placed) = world.entity_mut(entity.id)
                && !placed.aspects.iter().any(|a| a == SNACK_CRUMBED_ASPECT)
            {
                placed.aspects.push(SNACK_CRUMBED_ASPECT.to_string());
            }
        }
        let now = world.game_time();
        self.state.record(result, now);
        self.bites_left = self.bites_left.saturating_sub(1);
    }
}

impl TickingSpawner for SnackSpawner {
    fn state(&self) -> &TickingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TickingState {
        &mut self.state
    }

    fn run(
        &mut self,
        engine: &mut BestSpawner,
        world: &mut dyn WorldMut,
        shared: &[Arc<dyn SpawningInfluence>],
    ) -> Vec<EntitySpawnResult> {
        if self.bites_left == 0 {
            return Vec::new();
        }
        let input = self.zone_input();
        let cause = SpawnCause::new(&self.state.name, None);
        let results = run_area_pass(self, engine, world, &input, cause, shared, Some(1));
        if !results.is_empty() {
            self.state.ticks_until_next_spawn = self.ticks_until_next_bite(engine.rng());
        }
        results
    }

    fn is_finished(&self, _world: &dyn WorldQuery) -> bool {
        self.bites_left == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawner::test_support::{engine, widen};
    use crate::test_world::{FlatWorld, flat_world};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn effect(kind: &str, value: f64) -> BaitEffect {
        BaitEffect {
            kind: kind.to_string(),
            subcategory: None,
            value,
            chance: 1.0,
        }
    }

    #[test]
    fn test_bite_time_shortens_countdown() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let scheduling = SchedulingConfig::default();
        let plain = SnackSpawner::new("snack", BlockPos::new(8, 10, 8), Vec::new(), 3, &scheduling, &mut rng);
        assert_eq!(plain.state.ticks_until_next_spawn, 4.0);

        let quick = SnackSpawner::new(
            "snack",
            BlockPos::new(8, 10, 8),
            vec![effect("bite_time", 0.5)],
            3,
            &scheduling,
            &mut rng,
        );
        assert_eq!(quick.state.ticks_until_next_spawn, 2.0);

        let instant = SnackSpawner::new(
            "snack",
            BlockPos::new(8, 10, 8),
            vec![effect("bite_time", 1.0)],
            3,
            &scheduling,
            &mut rng,
        );
        assert_eq!(instant.state.ticks_until_next_spawn, 1.0);
    }

    #[test]
    fn test_lure_tier_adds_normalizing_influence() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let scheduling = SchedulingConfig::default();
        let plain = SnackSpawner::new("snack", BlockPos::new(8, 10, 8), Vec::new(), 3, &scheduling, &mut rng);
        assert_eq!(plain.influences().len(), 2);
        let lured = SnackSpawner::new(
            "snack",
            BlockPos::new(8, 10, 8),
            vec![effect("rarity_bucket", 2.0)],
            3,
            &scheduling,
            &mut rng,
        );
        assert_eq!(lured.influences().len(), 3);
        assert_eq!(lured.max_entities_per_chunk(), scheduling.snack_max_entities_per_chunk);
    }

    #[test]
    fn test_snack_spawns_one_per_bite_until_eaten() {
        let FlatWorld { mut world, .. } = flat_world(10);
        widen(&mut world);
        let mut engine = engine();
        let scheduling = engine.config().scheduling.clone();
        let mut spawner = SnackSpawner::new(
            "snack",
            BlockPos::new(8, 10, 8),
            vec![effect("level", 5.0)],
            2,
            &scheduling,
            engine.rng(),
        );

        let mut spawned = 0;
        for _ in 0..8 {
            world.advance(1);
            let results = spawner.tick(&mut engine, &mut world, &[]);
            assert!(results.len() <= 1);
            spawned += results.len();
        }
        assert_eq!(spawned, 2);
        assert_eq!(spawner.bites_left, 0);
        assert!(spawner.is_finished(&world));
        for entity in world.entities() {
            assert!(entity.aspects.contains(&SNACK_CRUMBED_ASPECT.to_string()));
            assert!(entity.level >= 7);
        }

        world.advance(1);
        for _ in 0..8 {
            assert!(spawner.tick(&mut engine, &mut world, &[]).is_empty());
        }
    }
}
