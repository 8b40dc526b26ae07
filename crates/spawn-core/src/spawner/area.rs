//! Ticking spawners that scan a cuboid each pass.

use std::f64::consts::TAU;
use std::sync::Arc;

use rand::{Rng, RngCore};
use spawn_config::{PlayerSpawnerConfig, SchedulingConfig};
use spawn_world::{BlockPos, EntityId, WorldMut, WorldQuery};

use super::{Spawner, TickingSpawner, TickingState, run_area_pass};
use crate::action::{EntitySpawnResult, SpawnAction};
use crate::cause::SpawnCause;
use crate::engine::BestSpawner;
use crate::influence::SpawningInfluence;
use crate::zone::ZoneInput;

/// Supplies the region of each pass.
pub trait ZoneSource {
    /// The region to scan, or `None` to skip this pass.
    fn zone_input(&self, world: &dyn WorldQuery, rng: &mut dyn RngCore) -> Option<ZoneInput>;

    /// Entity credited as the cause of the pass.
    fn cause_entity(&self) -> Option<EntityId> {
        None
    }
}

/// A static cuboid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedArea(pub ZoneInput);

impl ZoneSource for FixedArea {
    fn zone_input(&self, _world: &dyn WorldQuery, _rng: &mut dyn RngCore) -> Option<ZoneInput> {
        Some(self.0)
    }
}

/// A slice placed at a random bearing and distance from a player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSlice {
    pub player: EntityId,
    pub min_distance: f32,
    pub max_distance: f32,
    pub diameter: i32,
    pub height: i32,
}

impl PlayerSlice {
    pub fn new(player: EntityId, config: &PlayerSpawnerConfig) -> Self {
        Self {
            player,
            min_distance: config.minimum_slice_distance_from_player,
            max_distance: config.maximum_slice_distance_from_player,
            diameter: config.slice_diameter.max(1),
            height: config.slice_height.max(1),
        }
    }
}

impl ZoneSource for PlayerSlice {
    fn zone_input(&self, world: &dyn WorldQuery, rng: &mut dyn RngCore) -> Option<ZoneInput> {
        let player = world.entity(self.player)?;
        let angle = rng.random::<f64>() * TAU;
        let min = self.min_distance.min(self.max_distance) as f64;
        let max = self.max_distance.max(self.min_distance) as f64;
        let distance = if max > min {
            rng.random_range(min..=max)
        } else {
            min
        };
        let center = player.position + glam::DVec3::new(angle.cos(), 0.0, angle.sin()) * distance;
        let center = BlockPos::from_dvec3(center);
        Some(ZoneInput::new(
            BlockPos::new(
                center.x - self.diameter / 2,
                center.y - self.height / 2,
                center.z - self.diameter / 2,
            ),
            self.diameter,
            self.height,
            self.diameter,
        ))
    }

    fn cause_entity(&self) -> Option<EntityId> {
        Some(self.player)
    }
}

/// A ticking spawner over whatever region its source yields.
#[derive(Debug)]
pub struct AreaSpawner<S> {
    pub state: TickingState,
    pub source: S,
}

pub type FixedAreaSpawner = AreaSpawner<FixedArea>;
pub type PlayerSpawner = AreaSpawner<PlayerSlice>;

impl<S: ZoneSource> AreaSpawner<S> {
    pub fn new(name: &str, source: S, scheduling: &SchedulingConfig) -> Self {
        Self {
            state: TickingState::new(name, scheduling),
            source,
        }
    }
}

impl FixedAreaSpawner {
    pub fn fixed(name: &str, input: ZoneInput, scheduling: &SchedulingConfig) -> Self {
        Self::new(name, FixedArea(input), scheduling)
    }
}

impl PlayerSpawner {
    /// The spawner following `player`, named after it.
    pub fn for_player(player: EntityId, config: &PlayerSpawnerConfig, scheduling: &SchedulingConfig) -> Self {
        Self::new(
            &Self::name_for(player),
            PlayerSlice::new(player, config),
            scheduling,
        )
    }

    pub fn name_for(player: EntityId) -> String {
        format!("player-{}", player.0)
    }

    pub fn player(&self) -> EntityId {
        self.source.player
    }
}

impl<S: ZoneSource> Spawner for AreaSpawner<S> {
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
        let now = world.game_time();
        self.state.record(result, now);
    }
}

impl<S: ZoneSource> TickingSpawner for AreaSpawner<S> {
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
        let Some(input) = self.source.zone_input(world, engine.rng()) else {
            return Vec::new();
        };
        let cause = SpawnCause::new(&self.state.name, self.source.cause_entity());
        run_area_pass(self, engine, world, &input, cause, shared, None)
    }

    fn is_finished(&self, world: &dyn WorldQuery) -> bool {
        self.source.cause_entity().is_some_and(|id| world.entity(id).is_none())
    }
}
