//! Influences that reshape bucket weights.

use rustc_hash::FxHashMap;

use super::SpawningInfluence;
use crate::bucket::SpawnBucket;

/// Flattens rarity odds by tier.
///
/// Each weight becomes `w^(1 / factor)` with
/// `factor = first_tier + gradient * (tier - 1)`, then all weights are
/// rescaled to sum to 100. Tier 0 leaves weights untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketNormalizingInfluence {
    pub tier: u32,
    pub gradient: f32,
    pub first_tier: f32,
}

impl BucketNormalizingInfluence {
    pub fn new(tier: u32) -> Self {
        Self {
            tier,
            gradient: 0.2,
            first_tier: 1.29,
        }
    }

    fn factor(&self) -> f64 {
        self.first_tier as f64 + (self.gradient as f64) * (self.tier as f64 - 1.0)
    }
}

impl SpawningInfluence for BucketNormalizingInfluence {
    fn affect_bucket_weights(&self, weights: &mut [(SpawnBucket, f32)]) {
        if self.tier == 0 {
            return;
        }
        let exponent = 1.0 / self.factor();
        for (_, weight) in weights.iter_mut() {
            *weight = (*weight as f64).powf(exponent) as f32;
        }
        let sum: f32 = weights.iter().map(|(_, w)| *w).sum();
        if sum <= 0.0 {
            return;
        }
        let to_100 = 100.0 / sum;
        for (_, weight) in weights.iter_mut() {
            *weight *= to_100;
        }
    }
}

/// Multiplies named buckets by fixed factors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BucketMultiplyingInfluence {
    pub multipliers: FxHashMap<String, f32>,
}

impl BucketMultiplyingInfluence {
    pub fn new(multipliers: &[(&str, f32)]) -> Self {
        Self {
            multipliers: multipliers
                .iter()
                .map(|(name, factor)| (name.to_string(), *factor))
                .collect(),
        }
    }
}

impl SpawningInfluence for BucketMultiplyingInfluence {
    fn affect_bucket_weights(&self, weights: &mut [(SpawnBucket, f32)]) {
        for (bucket, weight) in weights.iter_mut() {
            if let Some(factor) = self.multipliers.get(&bucket.name) {
                *weight = (*weight * factor).max(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::base_weights;

    fn buckets() -> Vec<SpawnBucket> {
        vec![
            SpawnBucket::new("common", 88.5),
            SpawnBucket::new("uncommon", 8.5),
            SpawnBucket::new("rare", 2.4),
            SpawnBucket::new("legendary", 0.6),
        ]
    }

    #[test]
    fn test_tier_zero_leaves_weights_unchanged() {
        let mut weights = base_weights(&buckets());
        BucketNormalizingInfluence::new(0).affect_bucket_weights(&mut weights);
        let values: Vec<f32> = weights.iter().map(|(_, w)| *w).collect();
        assert_eq!(values, vec![88.5, 8.5, 2.4, 0.6]);
    }

    #[test]
    fn test_higher_tier_flattens_and_sums_to_100() {
        let mut tier1 = base_weights(&buckets());
        BucketNormalizingInfluence::new(1).affect_bucket_weights(&mut tier1);
        let mut tier3 = base_weights(&buckets());
        BucketNormalizingInfluence::new(3).affect_bucket_weights(&mut tier3);

        let sum: f32 = tier3.iter().map(|(_, w)| *w).sum();
        assert!((sum - 100.0).abs() < 1e-3);
        // The rarest bucket gains share as the tier rises.
        assert!(tier1[3].1 > 0.6);
        assert!(tier3[3].1 > tier1[3].1);
        assert!(tier3[0].1 < tier1[0].1);
    }

    #[test]
    fn test_multiplier_only_touches_named_buckets() {
        let mut weights = base_weights(&buckets());
        BucketMultiplyingInfluence::new(&[("rare", 5.5)]).affect_bucket_weights(&mut weights);
        assert_eq!(weights[0].1, 88.5);
        assert!((weights[2].1 - 13.2).abs() < 1e-4);
    }
}
