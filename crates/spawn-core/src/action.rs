//! Spawn actions and the hooks that observe them.
//!
//! A [`SpawnAction`] is a chosen (position, detail) pair waiting to be
//! realized. [`SpawnAction::run`] builds the entity, asks every observer
//! whether to go ahead and only then places it. A cancelled action leaves
//! the world and every influence untouched.

use std::fmt::Debug;
use std::sync::Arc;

use rand::RngCore;
use spawn_world::{LivingEntity, WorldMut};
use tracing::debug;

use crate::bucket::SpawnBucket;
use crate::cause::SpawnCause;
use crate::detail::{LevelRange, SpawnDetail};
use crate::position::SpawnablePosition;

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Answer of the pre-spawn hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnDecision {
    Proceed,
    Cancel,
}

/// Receives pipeline events. Every method has a no-op default.
pub trait SpawnObserver: Send + Sync {
    /// Called after the bucket draw; may replace the bucket.
    fn on_bucket_chosen(
        &self,
        _cause: &SpawnCause,
        _bucket: &mut SpawnBucket,
        _weights: &[(SpawnBucket, f32)],
    ) {
    }

    /// Called once the bucket is final.
    fn after_bucket_chosen(&self, _cause: &SpawnCause, _bucket: &SpawnBucket) {}

    /// Last chance to stop a spawn. Runs before anything is placed.
    fn before_spawn(&self, _action: &SpawnAction, _entity: &LivingEntity) -> SpawnDecision {
        SpawnDecision::Proceed
    }

    fn after_spawn(&self, _action: &SpawnAction, _entity: &LivingEntity) {}
}

/// Names the season at a position; the name is added as an aspect.
pub trait SeasonResolver: Send + Sync {
    fn season(&self, position: &SpawnablePosition) -> Option<String>;
}

impl<F> SeasonResolver for F
where
    F: Fn(&SpawnablePosition) -> Option<String> + Send + Sync,
{
    fn season(&self, position: &SpawnablePosition) -> Option<String> {
        self(position)
    }
}

/// Observers and resolvers registered with the engine.
#[derive(Clone, Default)]
pub struct SpawnHooks {
    pub observers: Vec<Arc<dyn SpawnObserver>>,
    pub season_resolver: Option<Arc<dyn SeasonResolver>>,
}

impl Debug for SpawnHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnHooks")
            .field("observers", &self.observers.len())
            .field("season_resolver", &self.season_resolver.is_some())
            .finish()
    }
}

impl SpawnHooks {
    pub fn add_observer(&mut self, observer: Arc<dyn SpawnObserver>) {
        self.observers.push(observer);
    }

    pub fn set_season_resolver(&mut self, resolver: Arc<dyn SeasonResolver>) {
        self.season_resolver = Some(resolver);
    }

    /// Lets observers replace `bucket`, then announces the final choice.
    pub fn bucket_chosen(
        &self,
        cause: &SpawnCause,
        bucket: &mut SpawnBucket,
        weights: &[(SpawnBucket, f32)],
    ) {
        for observer in &self.observers {
            observer.on_bucket_chosen(cause, bucket, weights);
        }
        for observer in &self.observers {
            observer.after_bucket_chosen(cause, bucket);
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Entities placed by one action.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySpawnResult {
    pub entities: Vec<LivingEntity>,
}

/// A chosen position and detail, with the rolls made at selection time.
#[derive(Clone, Debug)]
pub struct SpawnAction {
    pub position: SpawnablePosition,
    pub bucket: SpawnBucket,
    pub detail: Arc<SpawnDetail>,
    pub entity_type: String,
    /// The level is rolled from this range when the action runs.
    pub level_range: LevelRange,
    pub held_item: Option<String>,
    pub drops: Option<String>,
    pub labels: Vec<String>,
    /// Index into the herd's members, for herd actions.
    pub herd_member: Option<usize>,
}

impl SpawnAction {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// The entity as it would be spawned, before hooks and influences.
    fn build_entity(&self, hooks: &SpawnHooks, rng: &mut dyn RngCore) -> LivingEntity {
        let mut entity = LivingEntity::creature(&self.entity_type, self.position.spawn_point());
        entity.level = self.level_range.random(rng).max(1) as u32;
        entity.held_item = self.held_item.clone();
        entity.drop_table = self.drops.clone();
        if let Some(season) = hooks
            .season_resolver
            .as_ref()
            .and_then(|resolver| resolver.season(&self.position))
        {
            entity.aspects.push(season);
        }
        entity
    }

    /// Realizes the action. Returns `None` when an observer cancels it.
    pub fn run(
        &self,
        world: &mut dyn WorldMut,
        hooks: &SpawnHooks,
        rng: &mut dyn RngCore,
    ) -> Option<EntitySpawnResult> {
        let mut entity = self.build_entity(hooks, rng);

        if hooks
            .observers
            .iter()
            .any(|observer| observer.before_spawn(self, &entity) == SpawnDecision::Cancel)
        {
            debug!(
                "Spawn of {} from {} cancelled",
                self.entity_type, self.detail.id
            );
            return None;
        }

        for influence in &self.position.influences {
            influence.affect_entity(&mut entity, rng);
        }
        entity.id = world.add_entity(entity.clone());

        for observer in &hooks.observers {
            observer.after_spawn(self, &entity);
        }
        for influence in &self.position.influences {
            influence.on_spawned(self, &entity);
        }
        Some(EntitySpawnResult {
            entities: vec![entity],
        })
    }
}
