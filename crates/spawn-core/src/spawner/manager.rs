//! Owns the ticking spawners of a world.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use spawn_config::SpawnerConfig;
use spawn_world::{EntityId, WorldMut, WorldQuery};
use tracing::{debug, info};

use super::{PlayerSpawner, Spawner, TickingSpawner};
use crate::engine::BestSpawner;
use crate::influence::{SpawningInfluence, prune_expired};

/// Ticks every registered spawner and holds influences they all share.
///
/// Shared influences are only changed between passes; during a tick each
/// spawner sees the same slice.
#[derive(Default)]
pub struct SpawnerManager {
    spawners: Vec<Box<dyn TickingSpawner>>,
    influences: Vec<Arc<dyn SpawningInfluence>>,
    players: FxHashSet<EntityId>,
}

impl SpawnerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spawner. A spawner with the same name is replaced.
    pub fn register(&mut self, spawner: Box<dyn TickingSpawner>) {
        self.unregister(spawner.name());
        info!("Registered spawner {}", spawner.name());
        self.spawners.push(spawner);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn TickingSpawner>> {
        let index = self.spawners.iter().position(|s| s.name() == name)?;
        info!("Unregistered spawner {name}");
        Some(self.spawners.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&dyn TickingSpawner> {
        self.spawners
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn TickingSpawner>> {
        self.spawners.iter_mut().find(|s| s.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.spawners.iter().map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.spawners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawners.is_empty()
    }

    /// Adds an influence seen by every spawner's passes.
    pub fn add_influence(&mut self, influence: Arc<dyn SpawningInfluence>) {
        self.influences.push(influence);
    }

    pub fn influences(&self) -> &[Arc<dyn SpawningInfluence>] {
        &self.influences
    }

    /// Ticks every spawner once and drops the finished ones. Returns the
    /// number of entities placed.
    pub fn tick_all(&mut self, engine: &mut BestSpawner, world: &mut dyn WorldMut) -> usize {
        prune_expired(&mut self.influences, world.game_time());

        let mut placed = 0;
        for spawner in &mut self.spawners {
            placed += spawner
                .tick(engine, world, &self.influences)
                .iter()
                .map(|result| result.entities.len())
                .sum::<usize>();
        }

        let query: &dyn WorldQuery = world;
        let before = self.spawners.len();
        self.spawners.retain(|spawner| {
            let finished = spawner.is_finished(query);
            if finished {
                debug!("Spawner {} finished", spawner.name());
            }
            !finished
        });
        if self.spawners.len() != before {
            let spawners = &self.spawners;
            self.players.retain(|id| {
                let name = PlayerSpawner::name_for(*id);
                spawners.iter().any(|s| s.name() == name)
            });
        }
        placed
    }

    /// Gives every online player a spawner and removes the spawners of
    /// players who left. With player spawning disabled, all are removed.
    pub fn sync_players(&mut self, world: &dyn WorldQuery, config: &SpawnerConfig) {
        let online: FxHashSet<EntityId> = if config.player.enabled {
            world.players().iter().map(|p| p.id).collect()
        } else {
            FxHashSet::default()
        };

        let gone: Vec<EntityId> = self
            .players
            .iter()
            .filter(|id| !online.contains(id))
            .copied()
            .collect();
        for id in gone {
            self.unregister(&PlayerSpawner::name_for(id));
            self.players.remove(&id);
        }

        let mut joined: Vec<EntityId> = online
            .into_iter()
            .filter(|id| !self.players.contains(id))
            .collect();
        joined.sort();
        for id in joined {
            self.register(Box::new(PlayerSpawner::for_player(
                id,
                &config.player,
                &config.scheduling,
            )));
            self.players.insert(id);
        }
    }
}
