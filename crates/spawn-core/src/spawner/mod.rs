//! Spawners: the things that decide when and where a pass runs.
//!
//! A [`Spawner`] owns its influences and reacts to realized spawns. Area
//! spawners ([`AreaSpawner`]) tick on a schedule and scan a cuboid chosen by
//! their [`ZoneSource`]; [`SnackSpawner`]s do the same around a placed bait;
//! [`TriggerSpawner`]s run once for a single precomputed position. The
//! [`SpawnerManager`] owns the ticking ones plus influences shared by all.

mod area;
mod manager;
mod snack;
mod trigger;

pub use area::{AreaSpawner, FixedArea, FixedAreaSpawner, PlayerSlice, PlayerSpawner, ZoneSource};
pub use manager::SpawnerManager;
pub use snack::{SNACK_CRUMBED_ASPECT, SNACK_RADIUS, SnackSpawner};
pub use trigger::TriggerSpawner;

use std::sync::Arc;

use glam::DVec3;
use spawn_config::{SchedulingConfig, ZoneConfig};
use spawn_world::{BlockPos, ChunkPos, EntityId, WorldMut, WorldQuery};
use tracing::debug;

use crate::action::{EntitySpawnResult, SpawnAction};
use crate::cause::SpawnCause;
use crate::engine::BestSpawner;
use crate::influence::{SpawningInfluence, ZoneInfluence, prune_expired};
use crate::zone::ZoneInput;

/// Chunk radius over which density caps are measured.
pub const ENTITY_LIMIT_CHUNK_RANGE: i32 = 3;

/// Vertical extent of the density box, in blocks.
const DENSITY_BOX_HEIGHT: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Something that spawns.
pub trait Spawner {
    fn name(&self) -> &str;
    fn influences(&self) -> &[Arc<dyn SpawningInfluence>];
    fn influences_mut(&mut self) -> &mut Vec<Arc<dyn SpawningInfluence>>;

    /// Density cap for area passes; the larger of this and the configured
    /// cap applies.
    fn max_entities_per_chunk(&self) -> f32;

    /// Called once per realized action.
    fn after_spawn(
        &mut self,
        _world: &mut dyn WorldMut,
        _action: &SpawnAction,
        _result: &EntitySpawnResult,
    ) {
    }
}

/// A spawner driven by the simulation clock.
pub trait TickingSpawner: Spawner {
    fn state(&self) -> &TickingState;
    fn state_mut(&mut self) -> &mut TickingState;

    /// Runs one pass.
    fn run(
        &mut self,
        engine: &mut BestSpawner,
        world: &mut dyn WorldMut,
        shared: &[Arc<dyn SpawningInfluence>],
    ) -> Vec<EntitySpawnResult>;

    /// A finished spawner is dropped by its manager.
    fn is_finished(&self, _world: &dyn WorldQuery) -> bool {
        false
    }

    /// Advances the countdown and runs a pass when it is due.
    fn tick(
        &mut self,
        engine: &mut BestSpawner,
        world: &mut dyn WorldMut,
        shared: &[Arc<dyn SpawningInfluence>],
    ) -> Vec<EntitySpawnResult> {
        if !self.state_mut().advance(world) {
            return Vec::new();
        }
        self.run(engine, world, shared)
    }
}

// ---------------------------------------------------------------------------
// Ticking state
// ---------------------------------------------------------------------------

/// Bookkeeping shared by every ticking spawner.
#[derive(Clone, Debug)]
pub struct TickingState {
    pub name: String,
    pub influences: Vec<Arc<dyn SpawningInfluence>>,
    /// Entities this spawner placed that are still in the world.
    pub tracked: Vec<EntityId>,
    /// Game time of the last realized spawn.
    pub last_spawn_time: Option<u64>,
    pub ticks_until_next_spawn: f32,
    pub ticks_between_spawns: f32,
    pub tick_timer_multiplier: f32,
    pub max_entities_per_chunk: f32,
    pub active: bool,
    removal_check_ticks: u32,
    removal_timer: u32,
}

impl TickingState {
    pub fn new(name: &str, scheduling: &SchedulingConfig) -> Self {
        Self {
            name: name.to_string(),
            influences: Vec::new(),
            tracked: Vec::new(),
            last_spawn_time: None,
            ticks_until_next_spawn: scheduling.initial_spawn_delay_ticks,
            ticks_between_spawns: scheduling.ticks_between_spawns,
            tick_timer_multiplier: scheduling.tick_timer_multiplier,
            max_entities_per_chunk: scheduling.max_entities_per_chunk,
            active: true,
            removal_check_ticks: scheduling.removal_check_ticks.max(1),
            removal_timer: 0,
        }
    }

    /// One tick of housekeeping. Returns `true` when a pass is due.
    ///
    /// Tracked entities that left the world are forgotten every
    /// `removal_check_ticks`; expired influences are dropped every tick.
    /// An inactive spawner keeps its countdown frozen.
    pub fn advance(&mut self, world: &dyn WorldQuery) -> bool {
        self.removal_timer += 1;
        if self.removal_timer >= self.removal_check_ticks {
            self.removal_timer = 0;
            self.tracked.retain(|id| world.entity(*id).is_some());
        }
        prune_expired(&mut self.influences, world.game_time());

        if !self.active {
            return false;
        }
        self.ticks_until_next_spawn -= self.tick_timer_multiplier;
        if self.ticks_until_next_spawn <= 0.0 {
            self.ticks_until_next_spawn = self.ticks_between_spawns;
            return true;
        }
        false
    }

    /// Remembers the entities of a realized spawn.
    pub fn record(&mut self, result: &EntitySpawnResult, game_time: u64) {
        self.tracked.extend(result.entities.iter().map(|e| e.id));
        self.last_spawn_time = Some(game_time);
    }
}

// ---------------------------------------------------------------------------
// Area passes
// ---------------------------------------------------------------------------

fn is_valid_start(world: &dyn WorldQuery, pos: BlockPos) -> bool {
    let above = pos.above();
    if !is_loaded(world, pos) || !is_loaded(world, above) {
        return false;
    }
    let blocks = world.blocks();
    blocks.get(world.block(above)).is_air_like() && !blocks.is_air(world.block(pos))
}

fn is_loaded(world: &dyn WorldQuery, pos: BlockPos) -> bool {
    pos.y >= world.min_build_height()
        && pos.y < world.max_build_height()
        && world.is_chunk_loaded(pos.chunk())
}

fn squeeze_within_bounds(world: &dyn WorldQuery, pos: BlockPos) -> BlockPos {
    BlockPos::new(
        pos.x,
        pos.y
            .clamp(world.min_build_height(), world.max_build_height() - 1),
        pos.z,
    )
}

/// Moves `input` vertically onto ground and fits it into the world.
///
/// The base must sit in a loaded chunk. When the base block is not a
/// solid-below, open-above start point, the search probes one block up,
/// then one down, widening up to `max_vertical_correction_blocks`. Both
/// corners are then clamped to build height; `None` if either lands in an
/// unloaded chunk or the cuboid collapses on any axis.
pub fn constrain_area(world: &dyn WorldQuery, input: &ZoneInput, zone: &ZoneConfig) -> Option<ZoneInput> {
    if !world.is_chunk_loaded(input.base.chunk()) {
        return None;
    }
    let original_y = input.base.y;
    let mut base = input.base;

    if !is_valid_start(world, base) {
        let mut found = None;
        for offset in 1..=zone.max_vertical_correction_blocks.max(1) {
            let up = BlockPos::new(base.x, original_y + offset, base.z);
            let down = BlockPos::new(base.x, original_y - offset, base.z);
            if is_valid_start(world, up) {
                found = Some(up);
                break;
            } else if is_valid_start(world, down) {
                found = Some(down);
                break;
            }
        }
        base = found?;
    }

    let min = squeeze_within_bounds(world, base);
    let max = squeeze_within_bounds(world, base.offset(input.length, input.height, input.width));
    if is_loaded(world, min)
        && is_loaded(world, max)
        && min.x < max.x
        && min.y < max.y
        && min.z < max.z
    {
        Some(ZoneInput::new(min, max.x - min.x, max.y - min.y, max.z - min.z))
    } else {
        None
    }
}

/// Non-player entities in the density box around `center`, or `None` when
/// part of the box is not loaded.
pub fn nearby_entity_count(world: &dyn WorldQuery, center: DVec3) -> Option<usize> {
    let half = DVec3::new(
        ENTITY_LIMIT_CHUNK_RANGE as f64 * 16.0,
        DENSITY_BOX_HEIGHT / 2.0,
        ENTITY_LIMIT_CHUNK_RANGE as f64 * 16.0,
    );
    let (min, max) = (center - half, center + half);
    let min_chunk = BlockPos::from_dvec3(min).chunk();
    let max_chunk = BlockPos::from_dvec3(max).chunk();
    for cx in min_chunk.x..=max_chunk.x {
        for cz in min_chunk.z..=max_chunk.z {
            if !world.is_chunk_loaded(ChunkPos::new(cx, cz)) {
                return None;
            }
        }
    }
    Some(
        world
            .living_entities_in(min, max)
            .iter()
            .filter(|e| !e.is_player)
            .count(),
    )
}

/// One full area pass: constrain, density check, generate, resolve, choose
/// a bucket, select and execute. `shared` influences come from the manager.
pub fn run_area_pass(
    spawner: &mut dyn Spawner,
    engine: &mut BestSpawner,
    world: &mut dyn WorldMut,
    input: &ZoneInput,
    cause: SpawnCause,
    shared: &[Arc<dyn SpawningInfluence>],
    max: Option<usize>,
) -> Vec<EntitySpawnResult> {
    prune_expired(spawner.influences_mut(), world.game_time());
    let max = max.unwrap_or(engine.config().scheduling.max_spawns_per_pass);

    let Some(area) = constrain_area(world, input, &engine.config().zone) else {
        debug!("{}: no valid area near {:?}", spawner.name(), input.base);
        return Vec::new();
    };

    let Some(nearby) = nearby_entity_count(world, area.center()) else {
        debug!("{}: density box not loaded", spawner.name());
        return Vec::new();
    };
    let chunks_covered = (ENTITY_LIMIT_CHUNK_RANGE * ENTITY_LIMIT_CHUNK_RANGE) as f32;
    let cap = engine
        .config()
        .scheduling
        .max_entities_per_chunk
        .max(spawner.max_entities_per_chunk());
    if nearby as f32 / chunks_covered >= cap {
        debug!("{}: {nearby} entities nearby, skipping pass", spawner.name());
        return Vec::new();
    }

    let cause = Arc::new(cause);
    let zone = match engine.generate(world, &area, Arc::clone(&cause)) {
        Ok(zone) => zone,
        Err(e) => {
            debug!("{}: {e}", spawner.name());
            return Vec::new();
        }
    };

    let mut influences: Vec<Arc<dyn SpawningInfluence>> = spawner.influences().to_vec();
    influences.extend(shared.iter().cloned());
    let positions = engine.resolve(world, &zone, &influences);

    influences.extend(zone.influences.iter().filter_map(|zi| match zi {
        ZoneInfluence::Unconditional(influence) => Some(Arc::clone(influence)),
        ZoneInfluence::Spatial { .. } => None,
    }));
    let Some(bucket) = engine.choose_bucket(&cause, &influences) else {
        return Vec::new();
    };

    let actions = engine.select(&bucket, positions, max, world);
    let mut results = Vec::with_capacity(actions.len());
    for action in &actions {
        if let Some(result) = engine.execute(world, action) {
            spawner.after_spawn(world, action, &result);
            results.push(result);
        }
    }
    results
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_world::{FlatWorld, flat_world};
    use spawn_world::{GridWorld, LivingEntity};

    fn scheduling() -> SchedulingConfig {
        SchedulingConfig {
            initial_spawn_delay_ticks: 3.0,
            ticks_between_spawns: 5.0,
            tick_timer_multiplier: 1.0,
            removal_check_ticks: 2,
            ..SchedulingConfig::default()
        }
    }

    #[test]
    fn test_countdown_starts_at_initial_delay() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut state = TickingState::new("test", &scheduling());
        let due: Vec<bool> = (0..9).map(|_| state.advance(&world)).collect();
        assert_eq!(
            due,
            vec![false, false, true, false, false, false, false, true, false]
        );
    }

    #[test]
    fn test_multiplier_speeds_up_countdown() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut state = TickingState::new("test", &scheduling());
        state.tick_timer_multiplier = 3.0;
        assert!(state.advance(&world));
        assert!(!state.advance(&world));
        assert!(state.advance(&world));
    }

    #[test]
    fn test_inactive_state_never_due() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut state = TickingState::new("test", &scheduling());
        state.active = false;
        assert!((0..20).all(|_| !state.advance(&world)));
        assert_eq!(state.ticks_until_next_spawn, 3.0);
    }

    #[test]
    fn test_removed_entities_are_forgotten() {
        let FlatWorld { mut world, .. } = flat_world(10);
        let id = world.add_entity(LivingEntity::creature("rabbit", DVec3::new(1.0, 10.0, 1.0)));
        let mut state = TickingState::new("test", &scheduling());
        state.record(
            &EntitySpawnResult {
                entities: vec![world.entity(id).unwrap().clone()],
            },
            7,
        );
        assert_eq!(state.last_spawn_time, Some(7));

        world.remove_entity(id);
        state.advance(&world);
        assert_eq!(state.tracked, vec![id]);
        state.advance(&world);
        assert!(state.tracked.is_empty());
    }

    #[test]
    fn test_constrain_area_probes_for_ground() {
        let FlatWorld { world, .. } = flat_world(10);
        let zone = ZoneConfig::default();

        let above = constrain_area(&world, &ZoneInput::new(BlockPos::new(2, 20, 2), 4, 6, 4), &zone)
            .unwrap();
        assert_eq!(above.base, BlockPos::new(2, 9, 2));
        assert_eq!((above.length, above.height, above.width), (4, 6, 4));

        let buried = constrain_area(&world, &ZoneInput::new(BlockPos::new(2, 3, 2), 4, 6, 4), &zone)
            .unwrap();
        assert_eq!(buried.base.y, 9);
    }

    #[test]
    fn test_constrain_area_rejects_unloaded_and_flat() {
        let FlatWorld { world, .. } = flat_world(10);
        let zone = ZoneConfig::default();
        assert!(constrain_area(&world, &ZoneInput::new(BlockPos::new(200, 9, 0), 4, 6, 4), &zone).is_none());
        // Far corner in an unloaded chunk.
        assert!(constrain_area(&world, &ZoneInput::new(BlockPos::new(28, 9, 0), 8, 6, 4), &zone).is_none());

        let mut limited = zone.clone();
        limited.max_vertical_correction_blocks = 2;
        assert!(constrain_area(&world, &ZoneInput::new(BlockPos::new(2, 20, 2), 4, 6, 4), &limited).is_none());
    }

    #[test]
    fn test_constrain_area_clamps_to_build_height() {
        let FlatWorld { world, .. } = flat_world(28);
        let area = constrain_area(&world, &ZoneInput::new(BlockPos::new(2, 27, 2), 4, 10, 4), &ZoneConfig::default())
            .unwrap();
        assert_eq!(area.base.y, 27);
        assert_eq!(area.height, 4);
    }

    #[test]
    fn test_density_requires_loaded_box() {
        let FlatWorld { mut world, .. } = flat_world(10);
        let center = DVec3::new(8.0, 10.0, 8.0);
        assert_eq!(nearby_entity_count(&world, center), None);

        test_support::widen(&mut world);
        world.add_entity(LivingEntity::creature("rabbit", DVec3::new(4.0, 10.0, 4.0)));
        world.add_entity(LivingEntity::player(DVec3::new(5.0, 10.0, 5.0)));
        assert_eq!(nearby_entity_count(&world, center), Some(1));
    }

    struct Plain(TickingState);

    impl Spawner for Plain {
        fn name(&self) -> &str {
            &self.0.name
        }
        fn influences(&self) -> &[Arc<dyn SpawningInfluence>] {
            &self.0.influences
        }
        fn influences_mut(&mut self) -> &mut Vec<Arc<dyn SpawningInfluence>> {
            &mut self.0.influences
        }
        fn max_entities_per_chunk(&self) -> f32 {
            self.0.max_entities_per_chunk
        }
        fn after_spawn(&mut self, world: &mut dyn WorldMut, _action: &SpawnAction, result: &EntitySpawnResult) {
            let now = world.game_time();
            self.0.record(result, now);
        }
    }

    fn prepared() -> (GridWorld, BestSpawner, Plain) {
        let FlatWorld { mut world, .. } = flat_world(10);
        test_support::widen(&mut world);
        let engine = test_support::engine();
        let spawner = Plain(TickingState::new("plain", &engine.config().scheduling));
        (world, engine, spawner)
    }

    #[test]
    fn test_area_pass_spawns_and_tracks() {
        let (mut world, mut engine, mut spawner) = prepared();
        let input = ZoneInput::new(BlockPos::new(0, 12, 0), 8, 8, 8);
        let results = run_area_pass(
            &mut spawner,
            &mut engine,
            &mut world,
            &input,
            SpawnCause::new("plain", None),
            &[],
            None,
        );
        assert_eq!(results.len(), 4);
        assert_eq!(world.entity_count(), 4);
        assert_eq!(spawner.0.tracked.len(), 4);
        for entity in world.entities() {
            assert_eq!(entity.position.y, 10.0);
        }
    }

    #[test]
    fn test_density_cap_skips_pass() {
        let (mut world, mut engine, mut spawner) = prepared();
        for i in 0..9 {
            world.add_entity(LivingEntity::creature("fox", DVec3::new(i as f64, 10.0, 20.0)));
        }
        let input = ZoneInput::new(BlockPos::new(0, 9, 0), 8, 8, 8);
        let results = run_area_pass(
            &mut spawner,
            &mut engine,
            &mut world,
            &input,
            SpawnCause::new("plain", None),
            &[],
            None,
        );
        assert!(results.is_empty());
        assert_eq!(world.entity_count(), 9);

        spawner.0.max_entities_per_chunk = 2.0;
        let results = run_area_pass(
            &mut spawner,
            &mut engine,
            &mut world,
            &input,
            SpawnCause::new("plain", None),
            &[],
            Some(1),
        );
        assert_eq!(results.len(), 1);
    }
}
