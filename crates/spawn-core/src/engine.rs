//! The spawning engine: registries, content and the pipeline entry points.
//!
//! [`BestSpawner`] owns everything a pass needs apart from the world and the
//! spawner itself: configuration, buckets, the type registries, the loaded
//! [`SpawnPool`], hooks and the random source. Spawners drive it through
//! the four stages `generate`, `resolve`, `choose_bucket` and `select`, then
//! `execute` each action.

use std::path::Path;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use spawn_config::SpawnerConfig;
use spawn_world::{BiomeRegistry, WorldMut, WorldQuery};
use tracing::{debug, info, warn};

use crate::action::{EntitySpawnResult, SpawnAction, SpawnHooks};
use crate::bucket::{SpawnBucket, base_weights, buckets_from_config};
use crate::cause::SpawnCause;
use crate::condition::ConditionRegistry;
use crate::detail::{DetailLoader, DetailTypeRegistry, SpawnDetail, SpawnPool};
use crate::error::{LoadError, ZoneError};
use crate::influence::{DetectorRegistry, SpawningInfluence};
use crate::position::{CalculatorRegistry, SpawnablePosition, resolve_positions};
use crate::selector::SpawningSelector;
use crate::weighted::weighted_selection;
use crate::zone::{SpawningZone, ZoneGenerator, ZoneInput};

fn loader<'a>(
    conditions: &'a ConditionRegistry,
    types: &'a DetailTypeRegistry,
    buckets: &'a [SpawnBucket],
    biomes: Option<&'a BiomeRegistry>,
) -> DetailLoader<'a> {
    let loader = DetailLoader::new(conditions, types, buckets);
    match biomes {
        Some(biomes) => loader.with_biomes(biomes),
        None => loader,
    }
}

pub struct BestSpawner {
    config: SpawnerConfig,
    buckets: Vec<SpawnBucket>,
    pub conditions: ConditionRegistry,
    pub detail_types: DetailTypeRegistry,
    pub calculators: CalculatorRegistry,
    pub detectors: DetectorRegistry,
    pub hooks: SpawnHooks,
    pool: SpawnPool,
    generator: ZoneGenerator,
    selector: SpawningSelector,
    rng: ChaCha8Rng,
}

impl BestSpawner {
    /// An engine with the built-in registries and an empty pool.
    pub fn new(config: SpawnerConfig) -> Self {
        let buckets = buckets_from_config(&config.buckets);
        let spacing = config.scheduling.minimum_distance_between_entities;
        Self {
            pool: SpawnPool::new(&buckets),
            buckets,
            conditions: ConditionRegistry::with_defaults(),
            detail_types: DetailTypeRegistry::with_defaults(),
            calculators: CalculatorRegistry::with_defaults(),
            detectors: DetectorRegistry::with_defaults(),
            hooks: SpawnHooks::default(),
            generator: ZoneGenerator::new(spacing),
            selector: SpawningSelector::new(spacing)
                .with_kind_weights(&config.zone.position_kind_weights),
            rng: ChaCha8Rng::seed_from_u64(config.scheduling.seed),
            config,
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn buckets(&self) -> &[SpawnBucket] {
        &self.buckets
    }

    pub fn pool(&self) -> &SpawnPool {
        &self.pool
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Replaces the pool with every detail found under `dir`.
    ///
    /// # Errors
    ///
    /// Fatal [`LoadError`]s (unknown type names or buckets, unreadable
    /// files). The current pool is kept when loading fails.
    pub fn load_details(
        &mut self,
        dir: &Path,
        biomes: Option<&BiomeRegistry>,
    ) -> Result<usize, LoadError> {
        let mut pool = SpawnPool::new(&self.buckets);
        let loaded = loader(&self.conditions, &self.detail_types, &self.buckets, biomes)
            .load_dir(dir, &mut pool)?;
        self.pool = pool;
        Ok(loaded)
    }

    /// Adds the details of an in-memory document to the pool.
    pub fn load_detail_value(
        &mut self,
        value: &Value,
        biomes: Option<&BiomeRegistry>,
    ) -> Result<usize, LoadError> {
        loader(&self.conditions, &self.detail_types, &self.buckets, biomes).load_value(
            value,
            "<inline>",
            &mut self.pool,
        )
    }

    /// Applies a new configuration. Details whose bucket disappeared are
    /// dropped from the pool.
    pub fn reload_config(&mut self, config: SpawnerConfig) {
        let buckets = buckets_from_config(&config.buckets);
        if buckets != self.buckets {
            let mut pool = SpawnPool::new(&buckets);
            for detail in self.pool.iter() {
                if let Err(e) = pool.insert(SpawnDetail::clone(detail)) {
                    warn!("Dropping spawn detail on reload: {e}");
                }
            }
            self.pool = pool;
            self.buckets = buckets;
        }
        let spacing = config.scheduling.minimum_distance_between_entities;
        self.generator = ZoneGenerator::new(spacing);
        self.selector =
            SpawningSelector::new(spacing).with_kind_weights(&config.zone.position_kind_weights);
        if config.scheduling.seed != self.config.scheduling.seed {
            self.rng = ChaCha8Rng::seed_from_u64(config.scheduling.seed);
        }
        self.config = config;
        info!("Spawner configuration applied");
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Stage one: snapshot the requested region.
    pub fn generate(
        &self,
        world: &dyn WorldQuery,
        input: &ZoneInput,
        cause: Arc<SpawnCause>,
    ) -> Result<SpawningZone, ZoneError> {
        self.generator
            .generate(world, input, cause, &self.detectors)
    }

    /// Stage two: every spawnable position in `zone`.
    pub fn resolve(
        &self,
        world: &dyn WorldQuery,
        zone: &SpawningZone,
        influences: &[Arc<dyn SpawningInfluence>],
    ) -> Vec<SpawnablePosition> {
        resolve_positions(
            world,
            zone,
            &self.calculators,
            &self.config.zone,
            self.config.scheduling.minimum_distance_between_entities,
            influences,
        )
    }

    /// Draws a bucket after letting `influences` adjust the base weights.
    /// Observers may replace the drawn bucket. Falls back to the first
    /// bucket when no weight is positive.
    pub fn choose_bucket(
        &mut self,
        cause: &SpawnCause,
        influences: &[Arc<dyn SpawningInfluence>],
    ) -> Option<SpawnBucket> {
        let mut weights = base_weights(&self.buckets);
        for influence in influences {
            influence.affect_bucket_weights(&mut weights);
        }
        let mut bucket = weighted_selection(&weights, &mut self.rng, |(_, w)| *w)
            .map(|(bucket, _)| bucket.clone())
            .or_else(|| self.buckets.first().cloned())?;
        self.hooks.bucket_chosen(cause, &mut bucket, &weights);
        debug!("{} chose bucket {}", cause.spawner, bucket.name);
        Some(bucket)
    }

    /// Stage four: up to `max` spawn actions from `bucket` over `positions`.
    pub fn select(
        &mut self,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        max: usize,
        world: &dyn WorldQuery,
    ) -> Vec<SpawnAction> {
        self.selector
            .select(&self.pool, bucket, positions, max, world, &mut self.rng)
    }

    /// Percent chance of each detail being drawn next.
    pub fn probabilities(
        &self,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        world: &dyn WorldQuery,
    ) -> Vec<(Arc<SpawnDetail>, f32)> {
        self.selector
            .probabilities(&self.pool, bucket, positions, world)
    }

    /// Summed effective weight of each detail across `positions`.
    pub fn total_weights(
        &self,
        bucket: &SpawnBucket,
        positions: Vec<SpawnablePosition>,
        world: &dyn WorldQuery,
    ) -> Vec<(Arc<SpawnDetail>, f32)> {
        self.selector
            .total_weights(&self.pool, bucket, positions, world)
    }

    /// Realizes one action in `world`.
    pub fn execute(
        &mut self,
        world: &mut dyn WorldMut,
        action: &SpawnAction,
    ) -> Option<EntitySpawnResult> {
        let result = action.run(world, &self.hooks, &mut self.rng)?;
        if self.config.debug.log_spawns {
            for entity in &result.entities {
                info!(
                    "Spawned {} (level {}) from {} in {} at {:.1}, {:.1}, {:.1}",
                    entity.entity_type,
                    entity.level,
                    action.detail.id,
                    action.bucket.name,
                    entity.position.x,
                    entity.position.y,
                    entity.position.z
                );
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SpawnObserver;
    use crate::influence::BucketMultiplyingInfluence;
    use crate::test_world::{flat_world, FlatWorld};
    use serde_json::json;
    use spawn_config::BucketConfig;
    use spawn_world::BlockPos;
    use std::fs;

    fn config() -> SpawnerConfig {
        let mut config = SpawnerConfig::default();
        config.buckets = vec![BucketConfig::new("common", 90.0), BucketConfig::new("rare", 10.0)];
        config.scheduling.minimum_distance_between_entities = 2.0;
        config.scheduling.seed = 11;
        config
    }

    fn rabbit() -> Value {
        json!({
            "id": "rabbit", "entity": "rabbit", "position_type": "grounded",
            "bucket": "common", "weight": 1.0, "level": "2-4"
        })
    }

    #[test]
    fn test_full_pass_on_flat_world() {
        let FlatWorld { mut world, .. } = flat_world(10);
        let mut engine = BestSpawner::new(config());
        assert_eq!(engine.load_detail_value(&rabbit(), None).unwrap(), 1);

        let cause = Arc::new(SpawnCause::new("test", None));
        let zone = engine
            .generate(&world, &ZoneInput::new(BlockPos::new(0, 4, 0), 8, 12, 8), cause)
            .unwrap();
        let positions = engine.resolve(&world, &zone, &[]);
        assert_eq!(positions.len(), 64);

        let bucket = SpawnBucket::new("common", 90.0);
        let actions = engine.select(&bucket, positions, 4, &world);
        assert_eq!(actions.len(), 4);
        for action in &actions {
            let result = engine.execute(&mut world, action).unwrap();
            assert!((2..=4).contains(&result.entities[0].level));
        }
        assert_eq!(world.entity_count(), 4);
    }

    #[test]
    fn test_choose_bucket_follows_influences() {
        let mut engine = BestSpawner::new(config());
        let cause = SpawnCause::new("test", None);
        let only_rare: Vec<Arc<dyn SpawningInfluence>> =
            vec![Arc::new(BucketMultiplyingInfluence::new(&[("common", 0.0)]))];
        for _ in 0..50 {
            assert_eq!(engine.choose_bucket(&cause, &only_rare).unwrap().name, "rare");
        }
    }

    #[test]
    fn test_zero_weights_fall_back_to_first_bucket() {
        let mut engine = BestSpawner::new(config());
        let none: Vec<Arc<dyn SpawningInfluence>> = vec![Arc::new(
            BucketMultiplyingInfluence::new(&[("common", 0.0), ("rare", 0.0)]),
        )];
        let bucket = engine
            .choose_bucket(&SpawnCause::new("test", None), &none)
            .unwrap();
        assert_eq!(bucket.name, "common");
    }

    struct AlwaysRare;

    impl SpawnObserver for AlwaysRare {
        fn on_bucket_chosen(
            &self,
            _cause: &SpawnCause,
            bucket: &mut SpawnBucket,
            _weights: &[(SpawnBucket, f32)],
        ) {
            *bucket = SpawnBucket::new("rare", 10.0);
        }
    }

    #[test]
    fn test_observer_replaces_bucket() {
        let mut engine = BestSpawner::new(config());
        engine.hooks.add_observer(Arc::new(AlwaysRare));
        let bucket = engine
            .choose_bucket(&SpawnCause::new("test", None), &[])
            .unwrap();
        assert_eq!(bucket.name, "rare");
    }

    #[test]
    fn test_load_details_from_dir_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("critters.json"),
            json!([rabbit(), {
                "id": "fox", "entity": "fox", "position_type": "grounded",
                "bucket": "rare", "weight": 1.0
            }])
            .to_string(),
        )
        .unwrap();

        let mut engine = BestSpawner::new(config());
        assert_eq!(engine.load_details(dir.path(), None).unwrap(), 2);
        assert_eq!(engine.pool().len(), 2);

        let mut narrowed = config();
        narrowed.buckets = vec![BucketConfig::new("common", 100.0)];
        engine.reload_config(narrowed);
        assert_eq!(engine.buckets().len(), 1);
        assert!(engine.pool().contains("rabbit"));
        assert!(!engine.pool().contains("fox"));
    }

    #[test]
    fn test_failed_load_keeps_pool() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.json"),
            json!({"id": "x", "entity": "x", "position_type": "airborne", "bucket": "common", "weight": 1.0})
                .to_string(),
        )
        .unwrap();
        let mut engine = BestSpawner::new(config());
        engine.load_detail_value(&rabbit(), None).unwrap();
        assert!(engine.load_details(dir.path(), None).is_err());
        assert!(engine.pool().contains("rabbit"));
    }
}
