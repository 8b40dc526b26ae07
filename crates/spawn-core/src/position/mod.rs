//! Spawnable positions: concrete world points plus the environment data
//! conditions are tested against.
//!
//! A position is tagged by its [`PositionKind`]. Area kinds (everything except
//! fishing) are derived by scanning a zone with a [`PositionCalculator`];
//! fishing positions are built directly from a cast by the trigger spawner.

mod calculator;
mod resolver;

pub use calculator::{
    CalculationInput, CalculatorRegistry, FlooredCalculator, PositionCalculator,
    SubmergedCalculator, SurfaceCalculator,
};
pub use resolver::resolve_positions;

use std::sync::{Arc, OnceLock};

use glam::DVec3;
use spawn_world::{BiomeId, BlockId, BlockPos, WorldQuery};

use crate::cause::{FishingCast, SpawnCause};
use crate::influence::SpawningInfluence;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The kind tag every position carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionKind {
    Grounded,
    Seafloor,
    Lavafloor,
    Surface,
    Submerged,
    Fishing,
}

impl PositionKind {
    pub const ALL: [PositionKind; 6] = [
        PositionKind::Grounded,
        PositionKind::Seafloor,
        PositionKind::Lavafloor,
        PositionKind::Surface,
        PositionKind::Submerged,
        PositionKind::Fishing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PositionKind::Grounded => "grounded",
            PositionKind::Seafloor => "seafloor",
            PositionKind::Lavafloor => "lavafloor",
            PositionKind::Surface => "surface",
            PositionKind::Submerged => "submerged",
            PositionKind::Fishing => "fishing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Area kinds come from zone scans and carry height and nearby blocks.
    pub fn is_area(self) -> bool {
        self != PositionKind::Fishing
    }
}

// ---------------------------------------------------------------------------
// Kind-specific data
// ---------------------------------------------------------------------------

/// Data shared by every area kind.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaInfo {
    /// The block the position stands on (or floats on, for surface).
    pub base_block: BlockId,
    /// Free space above the position, capped by configuration.
    pub height: i32,
    /// Distinct blocks within the configured nearby box.
    pub nearby_blocks: Vec<BlockId>,
}

/// Fluid data for surface and submerged positions.
#[derive(Clone, Debug, PartialEq)]
pub struct FluidInfo {
    pub fluid_block: BlockId,
    pub is_source: bool,
    /// For surface: how deep the fluid body is below. For submerged: how far
    /// below the fluid surface the position sits.
    pub depth: i32,
}

/// Data for a position produced by a fishing cast.
#[derive(Clone, Debug, PartialEq)]
pub struct FishingInfo {
    pub cast: FishingCast,
    pub fluid_block: BlockId,
    pub nearby_blocks: Vec<BlockId>,
}

/// Kind tag plus the data that kind carries.
#[derive(Clone, Debug, PartialEq)]
pub enum PositionData {
    Grounded(AreaInfo),
    Seafloor(AreaInfo),
    Lavafloor(AreaInfo),
    Surface(AreaInfo, FluidInfo),
    Submerged(AreaInfo, FluidInfo),
    Fishing(FishingInfo),
}

impl PositionData {
    pub fn kind(&self) -> PositionKind {
        match self {
            PositionData::Grounded(_) => PositionKind::Grounded,
            PositionData::Seafloor(_) => PositionKind::Seafloor,
            PositionData::Lavafloor(_) => PositionKind::Lavafloor,
            PositionData::Surface(..) => PositionKind::Surface,
            PositionData::Submerged(..) => PositionKind::Submerged,
            PositionData::Fishing(_) => PositionKind::Fishing,
        }
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// World-wide state captured once per pass and shared by every position.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub dimension: String,
    pub seed: i64,
    pub game_time: u64,
    pub day_time: u64,
    pub moon_phase: u8,
    pub raining: bool,
    pub thundering: bool,
}

impl Environment {
    pub fn capture(world: &dyn WorldQuery) -> Self {
        Self {
            dimension: world.dimension().to_string(),
            seed: world.seed(),
            game_time: world.game_time(),
            day_time: world.day_time(),
            moon_phase: world.moon_phase(),
            raining: world.is_raining(),
            thundering: world.is_thundering(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpawnablePosition
// ---------------------------------------------------------------------------

/// A world point eligible to host a spawn.
#[derive(Clone, Debug)]
pub struct SpawnablePosition {
    pub cause: Arc<SpawnCause>,
    pub environment: Arc<Environment>,
    /// Absolute block coordinates.
    pub pos: BlockPos,
    pub biome: BiomeId,
    pub light: u8,
    pub sky_light: u8,
    pub can_see_sky: bool,
    /// Influences active at this position.
    pub influences: Vec<Arc<dyn SpawningInfluence>>,
    /// Free-form tags added by influences, matched by `markers` conditions.
    pub markers: Vec<String>,
    pub data: PositionData,
    /// Shared between clones so the lookup runs at most once per pass.
    structures: Arc<OnceLock<Vec<String>>>,
}

impl SpawnablePosition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cause: Arc<SpawnCause>,
        environment: Arc<Environment>,
        pos: BlockPos,
        biome: BiomeId,
        light: u8,
        sky_light: u8,
        can_see_sky: bool,
        influences: Vec<Arc<dyn SpawningInfluence>>,
        data: PositionData,
    ) -> Self {
        Self {
            cause,
            environment,
            pos,
            biome,
            light,
            sky_light,
            can_see_sky,
            influences,
            markers: Vec::new(),
            data,
            structures: Arc::new(OnceLock::new()),
        }
    }

    pub fn kind(&self) -> PositionKind {
        self.data.kind()
    }

    /// Area data, for every kind except fishing.
    pub fn area(&self) -> Option<&AreaInfo> {
        match &self.data {
            PositionData::Grounded(area)
            | PositionData::Seafloor(area)
            | PositionData::Lavafloor(area)
            | PositionData::Surface(area, _)
            | PositionData::Submerged(area, _) => Some(area),
            PositionData::Fishing(_) => None,
        }
    }

    /// Fluid data, for surface and submerged positions.
    pub fn fluid(&self) -> Option<&FluidInfo> {
        match &self.data {
            PositionData::Surface(_, fluid) | PositionData::Submerged(_, fluid) => Some(fluid),
            _ => None,
        }
    }

    pub fn fishing(&self) -> Option<&FishingInfo> {
        match &self.data {
            PositionData::Fishing(info) => Some(info),
            _ => None,
        }
    }

    /// Blocks near the position, for area and fishing kinds alike.
    pub fn nearby_blocks(&self) -> &[BlockId] {
        match &self.data {
            PositionData::Fishing(info) => &info.nearby_blocks,
            _ => self.area().map_or(&[], |area| &area.nearby_blocks),
        }
    }

    /// Structures containing this position, looked up on first use.
    pub fn structures(&self, world: &dyn WorldQuery) -> &[String] {
        self.structures.get_or_init(|| world.structures_at(self.pos))
    }

    /// Whether the structure lookup has already run.
    pub fn structures_resolved(&self) -> bool {
        self.structures.get().is_some()
    }

    /// Where a spawned entity is placed: centred on the block, one above it.
    pub fn spawn_point(&self) -> DVec3 {
        self.pos.as_dvec3() + DVec3::new(0.5, 1.0, 0.5)
    }

    /// Euclidean distance between block positions.
    pub fn distance_to(&self, other: &SpawnablePosition) -> f64 {
        self.pos.distance_sq(other.pos).sqrt()
    }

    /// Attaches an influence and lets it adjust this position.
    pub fn attach_influence(&mut self, influence: Arc<dyn SpawningInfluence>) {
        influence.affect_position(self);
        self.influences.push(influence);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A grounded position with neutral environment data.
    pub fn grounded_at(pos: BlockPos, height: i32) -> SpawnablePosition {
        SpawnablePosition::new(
            Arc::new(SpawnCause::new("test", None)),
            Arc::new(Environment {
                dimension: "overworld".to_string(),
                seed: 0,
                game_time: 0,
                day_time: 6_000,
                moon_phase: 0,
                raining: false,
                thundering: false,
            }),
            pos,
            BiomeId(0),
            15,
            15,
            true,
            Vec::new(),
            PositionData::Grounded(AreaInfo {
                base_block: BlockId(1),
                height,
                nearby_blocks: vec![BlockId(1)],
            }),
        )
    }

    /// Same neutral position, but with arbitrary kind data.
    pub fn with_data(pos: BlockPos, data: PositionData) -> SpawnablePosition {
        let mut position = grounded_at(pos, 4);
        position.data = data;
        position
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in PositionKind::ALL {
            assert_eq!(PositionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PositionKind::from_name("airborne"), None);
    }

    #[test]
    fn test_spawn_point_is_centred_above() {
        let position = grounded_at(BlockPos::new(2, 64, -3), 4);
        assert_eq!(position.spawn_point(), DVec3::new(2.5, 65.0, -2.5));
    }

    #[test]
    fn test_clones_share_structure_cache() {
        let position = grounded_at(BlockPos::new(0, 0, 0), 4);
        let copy = position.clone();
        assert!(!copy.structures_resolved());
        let _ = position.structures.set(vec!["village".to_string()]);
        assert!(copy.structures_resolved());
    }

    #[test]
    fn test_fishing_has_no_area() {
        let position = with_data(
            BlockPos::new(0, 0, 0),
            PositionData::Fishing(FishingInfo {
                cast: FishingCast::default(),
                fluid_block: BlockId(2),
                nearby_blocks: vec![BlockId(3)],
            }),
        );
        assert!(position.area().is_none());
        assert_eq!(position.nearby_blocks(), &[BlockId(3)]);
        assert_eq!(position.kind(), PositionKind::Fishing);
    }
}
