//! Loaded details indexed by bucket.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use spawn_world::WorldQuery;

use super::SpawnDetail;
use crate::bucket::SpawnBucket;
use crate::error::LoadError;
use crate::position::{PositionKind, SpawnablePosition};

/// Every loaded detail, grouped by bucket name in load order.
#[derive(Clone, Debug, Default)]
pub struct SpawnPool {
    by_bucket: FxHashMap<String, Vec<Arc<SpawnDetail>>>,
    ids: FxHashSet<String>,
}

impl SpawnPool {
    /// An empty pool accepting details for `buckets`.
    pub fn new(buckets: &[SpawnBucket]) -> Self {
        Self {
            by_bucket: buckets
                .iter()
                .map(|b| (b.name.clone(), Vec::new()))
                .collect(),
            ids: FxHashSet::default(),
        }
    }

    /// Adds a detail. Returns `Ok(false)` if a detail with the same id is
    /// already present.
    pub fn insert(&mut self, detail: SpawnDetail) -> Result<bool, LoadError> {
        let Some(details) = self.by_bucket.get_mut(&detail.bucket) else {
            return Err(LoadError::UnknownBucket {
                id: detail.id,
                bucket: detail.bucket,
            });
        };
        if !self.ids.insert(detail.id.clone()) {
            return Ok(false);
        }
        details.push(Arc::new(detail));
        Ok(true)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<SpawnDetail>> {
        self.iter().find(|detail| detail.id == id)
    }

    /// Details in `bucket` for positions of `kind`.
    pub fn retrieve(&self, bucket: &str, kind: PositionKind) -> Vec<Arc<SpawnDetail>> {
        self.by_bucket
            .get(bucket)
            .map(|details| {
                details
                    .iter()
                    .filter(|d| d.position_type == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Details of `bucket` that may spawn at `position`: pool details whose
    /// conditions hold, plus details injected by the position's influences,
    /// minus anything an influence vetoes.
    pub fn matching(
        &self,
        bucket: &SpawnBucket,
        position: &SpawnablePosition,
        world: &dyn WorldQuery,
    ) -> Vec<Arc<SpawnDetail>> {
        let mut details: Vec<Arc<SpawnDetail>> = self
            .retrieve(&bucket.name, position.kind())
            .into_iter()
            .filter(|d| d.is_satisfied_by(position, world))
            .collect();
        for influence in &position.influences {
            details.extend(
                influence
                    .injected_details(bucket, position)
                    .into_iter()
                    .filter(|d| d.is_satisfied_by(position, world)),
            );
        }
        details.retain(|detail| {
            position
                .influences
                .iter()
                .all(|influence| influence.affect_spawnable(detail, position))
        });
        details
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SpawnDetail>> {
        self.by_bucket.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::test_support::detail;
    use crate::influence::SpawningInfluence;
    use crate::position::test_support::grounded_at;
    use crate::test_world::{flat_world, FlatWorld};
    use serde_json::json;
    use spawn_world::BlockPos;

    fn pool() -> SpawnPool {
        SpawnPool::new(&[SpawnBucket::new("common", 90.0), SpawnBucket::new("rare", 10.0)])
    }

    fn entity(id: &str, bucket: &str, extra: serde_json::Value) -> SpawnDetail {
        let mut value = json!({
            "id": id, "entity": id, "position_type": "grounded", "bucket": bucket, "weight": 1.0
        });
        if let (Some(object), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            object.extend(extra.clone());
        }
        (*detail(value)).clone()
    }

    #[test]
    fn test_insert_rejects_unknown_bucket_and_skips_duplicates() {
        let mut pool = pool();
        assert!(pool.insert(entity("rabbit", "common", json!({}))).unwrap());
        assert!(!pool.insert(entity("rabbit", "rare", json!({}))).unwrap());
        let err = pool.insert(entity("fox", "mythic", json!({}))).unwrap_err();
        assert!(matches!(err, LoadError::UnknownBucket { bucket, .. } if bucket == "mythic"));
        assert_eq!(pool.len(), 1);
        assert!(pool.retrieve("rare", PositionKind::Grounded).is_empty());
    }

    #[test]
    fn test_matching_filters_by_condition_and_kind() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut pool = pool();
        pool.insert(entity("low", "common", json!({"conditions": [{"max_y": 20}]})))
            .unwrap();
        pool.insert(entity("high", "common", json!({"conditions": [{"min_y": 20}]})))
            .unwrap();
        pool.insert(entity("rare_one", "rare", json!({}))).unwrap();

        let position = grounded_at(BlockPos::new(0, 9, 0), 4);
        let ids: Vec<String> = pool
            .matching(&SpawnBucket::new("common", 90.0), &position, &world)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["low".to_string()]);
    }

    #[derive(Debug)]
    struct Veto(&'static str);

    impl SpawningInfluence for Veto {
        fn affect_spawnable(&self, detail: &SpawnDetail, _position: &SpawnablePosition) -> bool {
            detail.id != self.0
        }
    }

    #[derive(Debug)]
    struct Inject(Arc<SpawnDetail>);

    impl SpawningInfluence for Inject {
        fn injected_details(
            &self,
            _bucket: &SpawnBucket,
            _position: &SpawnablePosition,
        ) -> Vec<Arc<SpawnDetail>> {
            vec![Arc::clone(&self.0)]
        }
    }

    #[test]
    fn test_influences_inject_and_veto() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut pool = pool();
        pool.insert(entity("rabbit", "common", json!({}))).unwrap();
        pool.insert(entity("fox", "common", json!({}))).unwrap();

        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        position.attach_influence(Arc::new(Veto("fox")));
        position.attach_influence(Arc::new(Inject(Arc::new(entity("bait_fish", "common", json!({}))))));

        let mut ids: Vec<String> = pool
            .matching(&SpawnBucket::new("common", 90.0), &position, &world)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["bait_fish".to_string(), "rabbit".to_string()]);
    }
}
