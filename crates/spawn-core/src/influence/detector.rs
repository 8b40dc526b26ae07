//! Influence detectors: find influence sources while a zone is scanned.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spawn_world::{BlockId, BlockPos, WorldQuery};

use super::{
    BaitEffectKind, BucketNormalizingInfluence, HoneyLogInfluence, IncenseInfluence,
    SpawnBaitInfluence, ZoneInfluence,
};
use crate::error::LoadError;
use crate::zone::ZoneInput;

/// Finds influence sources for a zone.
pub trait InfluenceDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Called for every scanned cell.
    fn detect_from_block(&self, _world: &dyn WorldQuery, _pos: BlockPos, _block: BlockId) -> Vec<ZoneInfluence> {
        Vec::new()
    }

    /// Called once per zone with the clamped request.
    fn detect_from_input(&self, _world: &dyn WorldQuery, _input: &ZoneInput) -> Vec<ZoneInfluence> {
        Vec::new()
    }
}

/// Search radius for point-of-interest detectors: the detector's own range
/// plus the footprint's diagonal.
pub fn search_range(range: i32, input: &ZoneInput) -> i32 {
    let length = input.length as f64;
    let width = input.width as f64;
    range + (length * length + width * width).sqrt().ceil() as i32
}

/// Detectors in registration order, keyed by name.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn InfluenceDetector>>,
    name_to_index: FxHashMap<String, usize>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lure, incense and honey-log detectors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn InfluenceDetector>; 3] = [
            Arc::new(LureDetector),
            Arc::new(IncenseDetector),
            Arc::new(HoneyLogDetector),
        ];
        for detector in defaults {
            let _ = registry.register(detector);
        }
        registry
    }

    pub fn register(&mut self, detector: Arc<dyn InfluenceDetector>) -> Result<(), LoadError> {
        let name = detector.name().to_string();
        if self.name_to_index.contains_key(&name) {
            return Err(LoadError::DuplicateKey(name));
        }
        self.name_to_index.insert(name, self.detectors.len());
        self.detectors.push(detector);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn InfluenceDetector>> {
        self.name_to_index.get(name).map(|&i| &self.detectors[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn InfluenceDetector>> {
        self.detectors.iter()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in detectors
// ---------------------------------------------------------------------------

/// Lure points of interest. Each becomes a bait influence over its range;
/// the highest lure tier found also flattens bucket odds zone-wide.
#[derive(Debug, Default)]
pub struct LureDetector;

impl LureDetector {
    pub const POI_KIND: &'static str = "lure";
    pub const RANGE: i32 = 48;
}

impl InfluenceDetector for LureDetector {
    fn name(&self) -> &str {
        "lure"
    }

    fn detect_from_input(&self, world: &dyn WorldQuery, input: &ZoneInput) -> Vec<ZoneInfluence> {
        let lures = world.points_of_interest(
            Self::POI_KIND,
            input.center_block(),
            search_range(Self::RANGE, input),
        );
        let mut influences = Vec::with_capacity(lures.len() + 1);
        let mut highest_tier = 0;
        for lure in lures {
            let tier = SpawnBaitInfluence::rarity_tier(&lure.effects).max(lure.tier as u32);
            highest_tier = highest_tier.max(tier);
            influences.push(ZoneInfluence::spatial(
                lure.pos,
                Self::RANGE as f64,
                Arc::new(SpawnBaitInfluence::new(lure.effects).at(lure.pos)),
            ));
        }
        if highest_tier > 0 {
            influences.push(ZoneInfluence::Unconditional(Arc::new(
                BucketNormalizingInfluence::new(highest_tier),
            )));
        }
        influences
    }
}

/// Incense burners: label weight boosts over their range.
#[derive(Debug, Default)]
pub struct IncenseDetector;

impl IncenseDetector {
    pub const POI_KIND: &'static str = "incense";
    pub const RANGE: i32 = 32;
}

impl InfluenceDetector for IncenseDetector {
    fn name(&self) -> &str {
        "incense"
    }

    fn detect_from_input(&self, world: &dyn WorldQuery, input: &ZoneInput) -> Vec<ZoneInfluence> {
        world
            .points_of_interest(Self::POI_KIND, input.center_block(), search_range(Self::RANGE, input))
            .into_iter()
            .filter_map(|burner| {
                let boosts: Vec<_> = burner
                    .effects
                    .iter()
                    .filter(|e| BaitEffectKind::of(e) == BaitEffectKind::Label)
                    .filter_map(|e| Some((e.subcategory.clone()?, e.value as f32)))
                    .collect();
                if boosts.is_empty() {
                    return None;
                }
                let multiplier = boosts.iter().map(|(_, m)| *m).fold(1.0, f32::max);
                Some(ZoneInfluence::spatial(
                    burner.pos,
                    Self::RANGE as f64,
                    Arc::new(IncenseInfluence {
                        labels: boosts.into_iter().map(|(label, _)| label).collect(),
                        multiplier,
                        expires_at: None,
                    }),
                ))
            })
            .collect()
    }
}

/// Blocks tagged `honey_log` found during the scan.
#[derive(Debug, Default)]
pub struct HoneyLogDetector;

impl HoneyLogDetector {
    pub const TAG: &'static str = "#honey_log";
    pub const RANGE: f64 = 32.0;
}

impl InfluenceDetector for HoneyLogDetector {
    fn name(&self) -> &str {
        "honey_log"
    }

    fn detect_from_block(&self, world: &dyn WorldQuery, pos: BlockPos, block: BlockId) -> Vec<ZoneInfluence> {
        if !world.blocks().matches(block, Self::TAG) {
            return Vec::new();
        }
        vec![ZoneInfluence::spatial(
            pos,
            Self::RANGE,
            Arc::new(HoneyLogInfluence::new(pos)),
        )]
    }
}
