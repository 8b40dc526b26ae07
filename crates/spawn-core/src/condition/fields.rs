//! Predicate field groups shared by condition variants.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use spawn_world::{BiomeId, BiomeRegistry, BlockId, BlockRegistry, WorldQuery};

use super::ConditionError;
use super::ranges::IntRanges;
use super::slime::is_slime_chunk;
use crate::position::{AreaInfo, FishingInfo, FluidInfo, SpawnablePosition};

// ---------------------------------------------------------------------------
// Entry lists
// ---------------------------------------------------------------------------

/// A list field as written in a document. `null` entries survive parsing so
/// the owning condition can be rejected rather than silently shortened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryList(pub Vec<Option<String>>);

impl EntryList {
    pub fn of(items: &[&str]) -> Self {
        Self(items.iter().map(|item| Some(item.to_string())).collect())
    }

    /// Non-null entries.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|entry| entry.as_deref())
    }

    pub fn has_null(&self) -> bool {
        self.0.iter().any(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `None` takes the other side; two lists are concatenated.
fn merge_list(mine: &mut Option<EntryList>, other: &Option<EntryList>) {
    if let Some(other) = other {
        mine.get_or_insert_with(EntryList::default)
            .0
            .extend(other.0.iter().cloned());
    }
}

/// `None` takes the other side; a set value on the other side wins.
fn merge_value<T: Clone>(mine: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        mine.clone_from(other);
    }
}

fn check_list(field: &'static str, list: &Option<EntryList>) -> Result<(), ConditionError> {
    match list {
        Some(list) if list.has_null() => Err(ConditionError::NullEntry(field)),
        _ => Ok(()),
    }
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

fn any_block_matches(blocks: &BlockRegistry, candidates: &[BlockId], patterns: &EntryList) -> bool {
    patterns
        .entries()
        .any(|pattern| candidates.iter().any(|&block| blocks.matches(block, pattern)))
}

// ---------------------------------------------------------------------------
// Base predicate
// ---------------------------------------------------------------------------

/// Predicates every condition carries. Each unset field passes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseCondition {
    pub dimensions: Option<EntryList>,
    /// Biome names or `#tag` patterns.
    pub biomes: Option<EntryList>,
    /// Moon phases as a range list, e.g. `"0-3,5"`.
    pub moon_phase: Option<String>,
    pub can_see_sky: Option<bool>,
    pub min_x: Option<i32>,
    pub min_y: Option<i32>,
    pub min_z: Option<i32>,
    pub max_x: Option<i32>,
    pub max_y: Option<i32>,
    pub max_z: Option<i32>,
    pub min_light: Option<u8>,
    pub max_light: Option<u8>,
    pub min_sky_light: Option<u8>,
    pub max_sky_light: Option<u8>,
    pub is_raining: Option<bool>,
    pub is_thundering: Option<bool>,
    /// Named ranges or `a-b` in day ticks.
    pub time_range: Option<String>,
    pub structures: Option<EntryList>,
    pub is_slime_chunk: Option<bool>,
    pub markers: Option<EntryList>,

    #[serde(skip)]
    resolved_biomes: Option<FxHashSet<BiomeId>>,
    #[serde(skip)]
    moon_phases: Option<IntRanges>,
    #[serde(skip)]
    times: Option<IntRanges>,
}

impl BaseCondition {
    /// Rejects null list entries and parses range strings.
    pub fn prepare(&mut self) -> Result<(), ConditionError> {
        check_list("dimensions", &self.dimensions)?;
        check_list("biomes", &self.biomes)?;
        check_list("structures", &self.structures)?;
        check_list("markers", &self.markers)?;
        self.moon_phases = self
            .moon_phase
            .as_deref()
            .map(str::parse::<IntRanges>)
            .transpose()
            .map_err(ConditionError::Range)?;
        self.times = self
            .time_range
            .as_deref()
            .map(IntRanges::parse_time)
            .transpose()
            .map_err(ConditionError::Range)?;
        Ok(())
    }

    /// Caches the IDs of every biome the `biomes` patterns match.
    pub fn resolve_biomes(&mut self, registry: &BiomeRegistry) {
        self.resolved_biomes = self.biomes.as_ref().map(|patterns| {
            registry
                .iter()
                .filter(|(_, def)| patterns.entries().any(|pattern| def.matches(pattern)))
                .map(|(id, _)| id)
                .collect()
        });
    }

    pub fn biomes_resolved(&self) -> bool {
        self.resolved_biomes.is_some()
    }

    pub fn merge(&mut self, other: &BaseCondition) {
        merge_list(&mut self.dimensions, &other.dimensions);
        merge_list(&mut self.biomes, &other.biomes);
        merge_value(&mut self.moon_phase, &other.moon_phase);
        merge_value(&mut self.can_see_sky, &other.can_see_sky);
        merge_value(&mut self.min_x, &other.min_x);
        merge_value(&mut self.min_y, &other.min_y);
        merge_value(&mut self.min_z, &other.min_z);
        merge_value(&mut self.max_x, &other.max_x);
        merge_value(&mut self.max_y, &other.max_y);
        merge_value(&mut self.max_z, &other.max_z);
        merge_value(&mut self.min_light, &other.min_light);
        merge_value(&mut self.max_light, &other.max_light);
        merge_value(&mut self.min_sky_light, &other.min_sky_light);
        merge_value(&mut self.max_sky_light, &other.max_sky_light);
        merge_value(&mut self.is_raining, &other.is_raining);
        merge_value(&mut self.is_thundering, &other.is_thundering);
        merge_value(&mut self.time_range, &other.time_range);
        merge_list(&mut self.structures, &other.structures);
        merge_value(&mut self.is_slime_chunk, &other.is_slime_chunk);
        merge_list(&mut self.markers, &other.markers);
        // Cached forms are stale after a merge.
        self.resolved_biomes = None;
        self.moon_phases = None;
        self.times = None;
    }

    pub fn is_satisfied_by(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        let env = &position.environment;
        let pos = position.pos;

        if let Some(dimensions) = &self.dimensions
            && !dimensions.entries().any(|d| d == env.dimension)
        {
            return false;
        }
        if !within(pos.x, self.min_x, self.max_x)
            || !within(pos.y, self.min_y, self.max_y)
            || !within(pos.z, self.min_z, self.max_z)
        {
            return false;
        }
        if !within(position.light, self.min_light, self.max_light)
            || !within(position.sky_light, self.min_sky_light, self.max_sky_light)
        {
            return false;
        }
        if self.can_see_sky.is_some_and(|v| v != position.can_see_sky)
            || self.is_raining.is_some_and(|v| v != env.raining)
            || self.is_thundering.is_some_and(|v| v != env.thundering)
        {
            return false;
        }
        if !in_ranges(&self.moon_phases, &self.moon_phase, env.moon_phase as i64, |text| {
            text.parse()
        }) {
            return false;
        }
        let day_time = (env.day_time % super::ranges::DAY_LENGTH as u64) as i64;
        if !in_ranges(&self.times, &self.time_range, day_time, IntRanges::parse_time) {
            return false;
        }
        if !self.biome_matches(position, world) {
            return false;
        }
        if let Some(markers) = &self.markers
            && !markers
                .entries()
                .any(|wanted| position.markers.iter().any(|m| m == wanted))
        {
            return false;
        }
        if self
            .is_slime_chunk
            .is_some_and(|v| v != is_slime_chunk(env.seed, pos.chunk()))
        {
            return false;
        }
        // Structure lookup is the expensive one; keep it last.
        if let Some(structures) = &self.structures {
            let found = position.structures(world);
            if !structures.entries().any(|wanted| found.iter().any(|s| s == wanted)) {
                return false;
            }
        }
        true
    }

    fn biome_matches(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        let Some(patterns) = &self.biomes else {
            return true;
        };
        if let Some(resolved) = &self.resolved_biomes {
            return resolved.contains(&position.biome);
        }
        world
            .biomes()
            .get(position.biome)
            .is_some_and(|def| patterns.entries().any(|pattern| def.matches(pattern)))
    }
}

fn in_ranges(
    compiled: &Option<IntRanges>,
    raw: &Option<String>,
    value: i64,
    parse: impl Fn(&str) -> Result<IntRanges, super::ranges::RangeParseError>,
) -> bool {
    match (compiled, raw) {
        (Some(ranges), _) => ranges.contains(value),
        (None, Some(text)) => parse(text).is_ok_and(|ranges| ranges.contains(value)),
        (None, None) => true,
    }
}

// ---------------------------------------------------------------------------
// Kind extensions
// ---------------------------------------------------------------------------

/// Height bounds and nearby blocks, for every area kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaFields {
    pub min_height: Option<i32>,
    pub max_height: Option<i32>,
    /// Any one of these must be among the position's nearby blocks.
    pub needed_nearby_blocks: Option<EntryList>,
}

impl AreaFields {
    pub fn prepare(&self) -> Result<(), ConditionError> {
        check_list("needed_nearby_blocks", &self.needed_nearby_blocks)
    }

    pub fn merge(&mut self, other: &AreaFields) {
        merge_value(&mut self.min_height, &other.min_height);
        merge_value(&mut self.max_height, &other.max_height);
        merge_list(&mut self.needed_nearby_blocks, &other.needed_nearby_blocks);
    }

    pub fn is_satisfied_by(&self, area: &AreaInfo, blocks: &BlockRegistry) -> bool {
        if !within(area.height, self.min_height, self.max_height) {
            return false;
        }
        match &self.needed_nearby_blocks {
            Some(needed) => any_block_matches(blocks, &area.nearby_blocks, needed),
            None => true,
        }
    }
}

/// Required base blocks for floored kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorFields {
    pub needed_base_blocks: Option<EntryList>,
}

impl FloorFields {
    pub fn prepare(&self) -> Result<(), ConditionError> {
        check_list("needed_base_blocks", &self.needed_base_blocks)
    }

    pub fn merge(&mut self, other: &FloorFields) {
        merge_list(&mut self.needed_base_blocks, &other.needed_base_blocks);
    }

    pub fn is_satisfied_by(&self, area: &AreaInfo, blocks: &BlockRegistry) -> bool {
        match &self.needed_base_blocks {
            Some(needed) => any_block_matches(blocks, &[area.base_block], needed),
            None => true,
        }
    }
}

/// Depth bounds and fluid identity for surface and submerged kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidFields {
    pub min_depth: Option<i32>,
    pub max_depth: Option<i32>,
    pub fluid_is_source: Option<bool>,
    /// Fluid block name or `#tag`.
    pub fluid: Option<String>,
}

impl FluidFields {
    pub fn merge(&mut self, other: &FluidFields) {
        merge_value(&mut self.min_depth, &other.min_depth);
        merge_value(&mut self.max_depth, &other.max_depth);
        merge_value(&mut self.fluid_is_source, &other.fluid_is_source);
        merge_value(&mut self.fluid, &other.fluid);
    }

    pub fn is_satisfied_by(&self, fluid: &FluidInfo, blocks: &BlockRegistry) -> bool {
        if !within(fluid.depth, self.min_depth, self.max_depth) {
            return false;
        }
        if self.fluid_is_source.is_some_and(|v| v != fluid.is_source) {
            return false;
        }
        match &self.fluid {
            Some(pattern) => blocks.matches(fluid.fluid_block, pattern),
            None => true,
        }
    }
}

/// Rod, lure and bait requirements for fishing positions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishingFields {
    pub rod: Option<String>,
    pub rod_type: Option<String>,
    pub bait: Option<String>,
    pub min_lure_level: Option<u8>,
    pub max_lure_level: Option<u8>,
    pub needed_nearby_blocks: Option<EntryList>,
}

impl FishingFields {
    pub fn prepare(&self) -> Result<(), ConditionError> {
        check_list("needed_nearby_blocks", &self.needed_nearby_blocks)
    }

    pub fn merge(&mut self, other: &FishingFields) {
        merge_value(&mut self.rod, &other.rod);
        merge_value(&mut self.rod_type, &other.rod_type);
        merge_value(&mut self.bait, &other.bait);
        merge_value(&mut self.min_lure_level, &other.min_lure_level);
        merge_value(&mut self.max_lure_level, &other.max_lure_level);
        merge_list(&mut self.needed_nearby_blocks, &other.needed_nearby_blocks);
    }

    pub fn is_satisfied_by(&self, info: &FishingInfo, blocks: &BlockRegistry) -> bool {
        let cast = &info.cast;
        if self.rod.as_ref().is_some_and(|rod| *rod != cast.rod) {
            return false;
        }
        if self
            .rod_type
            .as_ref()
            .is_some_and(|rod_type| Some(rod_type) != cast.rod_type.as_ref())
        {
            return false;
        }
        if self.bait.as_ref().is_some_and(|bait| Some(bait) != cast.bait.as_ref()) {
            return false;
        }
        if !within(cast.lure_level, self.min_lure_level, self.max_lure_level) {
            return false;
        }
        match &self.needed_nearby_blocks {
            Some(needed) => any_block_matches(blocks, &info.nearby_blocks, needed),
            None => true,
        }
    }
}
