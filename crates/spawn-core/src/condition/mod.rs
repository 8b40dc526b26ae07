//! Declarative spawn conditions.
//!
//! A [`SpawningCondition`] is a conjunctive predicate set over one position
//! kind: a shared [`BaseCondition`] plus kind-specific field groups. Which
//! variant a document produces is decided by the [`ConditionRegistry`],
//! keyed by name. [`CompositeCondition`] combines conditions into boolean
//! expressions.

mod composite;
mod fields;
mod ranges;
mod registry;
mod slime;

pub use composite::CompositeCondition;
pub use fields::{AreaFields, BaseCondition, EntryList, FishingFields, FloorFields, FluidFields};
pub use ranges::{IntRanges, RangeParseError};
pub use registry::{ConditionParser, ConditionRegistry};
pub use slime::is_slime_chunk;

use spawn_world::{BiomeRegistry, WorldQuery};
use thiserror::Error;

use crate::position::{PositionKind, SpawnablePosition};

/// Why a condition cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("list `{0}` contains a null entry")]
    NullEntry(&'static str),
    #[error(transparent)]
    Range(#[from] RangeParseError),
}

/// One conjunctive predicate set, tagged by the position kind it applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum SpawningCondition {
    /// Applies to every kind.
    Basic(BaseCondition),
    /// Applies to every area kind.
    Area {
        base: BaseCondition,
        area: AreaFields,
    },
    Grounded {
        base: BaseCondition,
        area: AreaFields,
        floor: FloorFields,
    },
    Seafloor {
        base: BaseCondition,
        area: AreaFields,
        floor: FloorFields,
    },
    Lavafloor {
        base: BaseCondition,
        area: AreaFields,
        floor: FloorFields,
    },
    Surface {
        base: BaseCondition,
        area: AreaFields,
        fluid: FluidFields,
    },
    Submerged {
        base: BaseCondition,
        area: AreaFields,
        fluid: FluidFields,
    },
    Fishing {
        base: BaseCondition,
        fishing: FishingFields,
    },
}

impl SpawningCondition {
    /// Registry name of this variant.
    pub fn name(&self) -> &'static str {
        match self {
            SpawningCondition::Basic(_) => "basic",
            SpawningCondition::Area { .. } => "area",
            SpawningCondition::Grounded { .. } => "grounded",
            SpawningCondition::Seafloor { .. } => "seafloor",
            SpawningCondition::Lavafloor { .. } => "lavafloor",
            SpawningCondition::Surface { .. } => "surface",
            SpawningCondition::Submerged { .. } => "submerged",
            SpawningCondition::Fishing { .. } => "fishing",
        }
    }

    pub fn base(&self) -> &BaseCondition {
        match self {
            SpawningCondition::Basic(base)
            | SpawningCondition::Area { base, .. }
            | SpawningCondition::Grounded { base, .. }
            | SpawningCondition::Seafloor { base, .. }
            | SpawningCondition::Lavafloor { base, .. }
            | SpawningCondition::Surface { base, .. }
            | SpawningCondition::Submerged { base, .. }
            | SpawningCondition::Fishing { base, .. } => base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseCondition {
        match self {
            SpawningCondition::Basic(base)
            | SpawningCondition::Area { base, .. }
            | SpawningCondition::Grounded { base, .. }
            | SpawningCondition::Seafloor { base, .. }
            | SpawningCondition::Lavafloor { base, .. }
            | SpawningCondition::Surface { base, .. }
            | SpawningCondition::Submerged { base, .. }
            | SpawningCondition::Fishing { base, .. } => base,
        }
    }

    fn area(&self) -> Option<&AreaFields> {
        match self {
            SpawningCondition::Area { area, .. }
            | SpawningCondition::Grounded { area, .. }
            | SpawningCondition::Seafloor { area, .. }
            | SpawningCondition::Lavafloor { area, .. }
            | SpawningCondition::Surface { area, .. }
            | SpawningCondition::Submerged { area, .. } => Some(area),
            _ => None,
        }
    }

    /// Whether this condition can apply to positions of `kind`.
    pub fn accepts(&self, kind: PositionKind) -> bool {
        match self {
            SpawningCondition::Basic(_) => true,
            SpawningCondition::Area { .. } => kind.is_area(),
            SpawningCondition::Grounded { .. } => kind == PositionKind::Grounded,
            SpawningCondition::Seafloor { .. } => kind == PositionKind::Seafloor,
            SpawningCondition::Lavafloor { .. } => kind == PositionKind::Lavafloor,
            SpawningCondition::Surface { .. } => kind == PositionKind::Surface,
            SpawningCondition::Submerged { .. } => kind == PositionKind::Submerged,
            SpawningCondition::Fishing { .. } => kind == PositionKind::Fishing,
        }
    }

    /// Tests every predicate against `position`. Positions of a kind this
    /// condition does not accept never match.
    pub fn is_satisfied_by(&self, position: &SpawnablePosition, world: &dyn WorldQuery) -> bool {
        if !self.accepts(position.kind()) {
            return false;
        }
        let blocks = world.blocks();
        let extras = match self {
            SpawningCondition::Basic(_) => true,
            SpawningCondition::Area { area, .. } => position
                .area()
                .is_some_and(|info| area.is_satisfied_by(info, blocks)),
            SpawningCondition::Grounded { area, floor, .. }
            | SpawningCondition::Seafloor { area, floor, .. }
            | SpawningCondition::Lavafloor { area, floor, .. } => {
                position.area().is_some_and(|info| {
                    area.is_satisfied_by(info, blocks) && floor.is_satisfied_by(info, blocks)
                })
            }
            SpawningCondition::Surface { area, fluid, .. }
            | SpawningCondition::Submerged { area, fluid, .. } => {
                match (position.area(), position.fluid()) {
                    (Some(info), Some(fluid_info)) => {
                        area.is_satisfied_by(info, blocks)
                            && fluid.is_satisfied_by(fluid_info, blocks)
                    }
                    _ => false,
                }
            }
            SpawningCondition::Fishing { fishing, .. } => position
                .fishing()
                .is_some_and(|info| fishing.is_satisfied_by(info, blocks)),
        };
        // Kind checks are cheap, the base may hit the structure lookup.
        extras && self.base().is_satisfied_by(position, world)
    }

    /// Validates list entries and compiles range strings.
    pub fn prepare(&mut self) -> Result<(), ConditionError> {
        self.base_mut().prepare()?;
        if let Some(area) = self.area() {
            area.prepare()?;
        }
        match self {
            SpawningCondition::Grounded { floor, .. }
            | SpawningCondition::Seafloor { floor, .. }
            | SpawningCondition::Lavafloor { floor, .. } => floor.prepare(),
            SpawningCondition::Fishing { fishing, .. } => fishing.prepare(),
            _ => Ok(()),
        }
    }

    /// Pre-resolves biome patterns against the live registry.
    pub fn resolve_biomes(&mut self, registry: &BiomeRegistry) {
        self.base_mut().resolve_biomes(registry);
    }

    /// Structural merge: unset fields take `other`'s value, set fields on
    /// `other` win, lists are concatenated. Kind-specific groups merge only
    /// when both sides carry them. Fails if the merged lists contain nulls.
    pub fn merge(&mut self, other: &SpawningCondition) -> Result<(), ConditionError> {
        self.base_mut().merge(other.base());
        match (&mut *self, other) {
            (
                SpawningCondition::Area { area, .. },
                SpawningCondition::Area { area: theirs, .. },
            ) => area.merge(theirs),
            (
                SpawningCondition::Grounded { area, floor, .. },
                SpawningCondition::Grounded {
                    area: their_area,
                    floor: their_floor,
                    ..
                },
            )
            | (
                SpawningCondition::Seafloor { area, floor, .. },
                SpawningCondition::Seafloor {
                    area: their_area,
                    floor: their_floor,
                    ..
                },
            )
            | (
                SpawningCondition::Lavafloor { area, floor, .. },
                SpawningCondition::Lavafloor {
                    area: their_area,
                    floor: their_floor,
                    ..
                },
            ) => {
                area.merge(their_area);
                floor.merge(their_floor);
            }
            (
                SpawningCondition::Surface { area, fluid, .. },
                SpawningCondition::Surface {
                    area: their_area,
                    fluid: their_fluid,
                    ..
                },
            )
            | (
                SpawningCondition::Submerged { area, fluid, .. },
                SpawningCondition::Submerged {
                    area: their_area,
                    fluid: their_fluid,
                    ..
                },
            ) => {
                area.merge(their_area);
                fluid.merge(their_fluid);
            }
            (
                SpawningCondition::Fishing { fishing, .. },
                SpawningCondition::Fishing {
                    fishing: theirs, ..
                },
            ) => fishing.merge(theirs),
            _ => {}
        }
        self.prepare()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::test_support::{grounded_at, with_data};
    use crate::position::{AreaInfo, FluidInfo, PositionData};
    use crate::test_world::{flat_world, FlatWorld};
    use serde_json::json;
    use spawn_world::{BlockId, BlockPos};

    fn parse(value: serde_json::Value, kind: &str) -> SpawningCondition {
        ConditionRegistry::with_defaults()
            .parse(&value, kind)
            .unwrap()
    }

    #[test]
    fn test_empty_condition_matches_only_its_kind() {
        let FlatWorld { world, water, .. } = flat_world(10);
        let condition = parse(json!({}), "grounded");
        let grounded = grounded_at(BlockPos::new(0, 9, 0), 4);
        let submerged = with_data(
            BlockPos::new(0, 9, 0),
            PositionData::Submerged(
                AreaInfo {
                    base_block: water,
                    height: 2,
                    nearby_blocks: vec![water],
                },
                FluidInfo {
                    fluid_block: water,
                    is_source: true,
                    depth: 2,
                },
            ),
        );
        assert!(condition.is_satisfied_by(&grounded, &world));
        assert!(!condition.is_satisfied_by(&submerged, &world));
        assert!(parse(json!({}), "basic").is_satisfied_by(&submerged, &world));
        assert!(parse(json!({}), "area").is_satisfied_by(&submerged, &world));
    }

    #[test]
    fn test_height_bounds_are_inclusive() {
        let FlatWorld { world, .. } = flat_world(10);
        let condition = parse(json!({"min_height": 2, "max_height": 4}), "grounded");
        let at = |height| grounded_at(BlockPos::new(0, 9, 0), height);
        assert!(!condition.is_satisfied_by(&at(1), &world));
        assert!(condition.is_satisfied_by(&at(2), &world));
        assert!(condition.is_satisfied_by(&at(4), &world));
        assert!(!condition.is_satisfied_by(&at(5), &world));
    }

    #[test]
    fn test_merge_fills_nulls_and_unions_lists() {
        let mut a = parse(json!({"biomes": ["plains"], "min_light": 3}), "grounded");
        let b = parse(
            json!({
                "biomes": ["plains", "#is_ocean"],
                "min_light": 7,
                "max_light": 12,
                "can_see_sky": true,
                "min_height": 2
            }),
            "grounded",
        );
        a.merge(&b).unwrap();
        let base = a.base();
        assert_eq!(base.max_light, Some(12));
        assert_eq!(base.min_light, Some(7));
        assert_eq!(base.can_see_sky, Some(true));
        assert_eq!(
            base.biomes,
            Some(EntryList::of(&["plains", "plains", "#is_ocean"]))
        );
        let SpawningCondition::Grounded { area, .. } = &a else {
            panic!("kind changed during merge");
        };
        assert_eq!(area.min_height, Some(2));
    }

    #[test]
    fn test_merge_with_null_entry_is_invalid() {
        let mut a = parse(json!({"biomes": ["plains"]}), "basic");
        let mut b = SpawningCondition::Basic(BaseCondition::default());
        b.base_mut().biomes = Some(EntryList(vec![None]));
        assert_eq!(a.merge(&b), Err(ConditionError::NullEntry("biomes")));
    }

    #[test]
    fn test_null_entry_rejected_at_parse() {
        let result = ConditionRegistry::with_defaults().parse(&json!({"markers": [null]}), "basic");
        assert!(result.is_err());
    }

    #[test]
    fn test_biomes_resolved_against_registry() {
        let FlatWorld {
            mut world, ocean, ..
        } = flat_world(10);
        let mut condition = parse(json!({"biomes": ["#is_ocean"]}), "grounded");
        condition.resolve_biomes(spawn_world::WorldQuery::biomes(&world));
        assert!(condition.base().biomes_resolved());

        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        assert!(!condition.is_satisfied_by(&position, &world));
        position.biome = ocean;
        assert!(condition.is_satisfied_by(&position, &world));

        // Unresolved conditions fall back to matching through the registry.
        world.set_all_biomes(ocean);
        let unresolved = parse(json!({"biomes": ["ocean"]}), "grounded");
        assert!(unresolved.is_satisfied_by(&position, &world));
    }

    #[test]
    fn test_time_moon_and_weather() {
        let FlatWorld { world, .. } = flat_world(10);
        let condition = parse(
            json!({"time_range": "night", "moon_phase": "0-3", "is_raining": false}),
            "basic",
        );
        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        assert!(!condition.is_satisfied_by(&position, &world));

        let mut env = (*position.environment).clone();
        env.day_time = 18_000;
        env.moon_phase = 2;
        position.environment = std::sync::Arc::new(env.clone());
        assert!(condition.is_satisfied_by(&position, &world));

        env.moon_phase = 5;
        position.environment = std::sync::Arc::new(env.clone());
        assert!(!condition.is_satisfied_by(&position, &world));

        env.moon_phase = 1;
        env.raining = true;
        position.environment = std::sync::Arc::new(env);
        assert!(!condition.is_satisfied_by(&position, &world));
    }

    #[test]
    fn test_bad_range_rejected_at_parse() {
        let result =
            ConditionRegistry::with_defaults().parse(&json!({"time_range": "teatime"}), "basic");
        assert!(result.is_err());
    }

    #[test]
    fn test_structures_checked_lazily() {
        let FlatWorld { mut world, .. } = flat_world(10);
        world.add_structure("village", BlockPos::new(0, 0, 0), BlockPos::new(8, 20, 8));
        let position = grounded_at(BlockPos::new(2, 9, 2), 4);

        let cheap_fail = parse(json!({"min_light": 16, "structures": ["village"]}), "grounded");
        assert!(!cheap_fail.is_satisfied_by(&position, &world));
        assert!(!position.structures_resolved());

        let condition = parse(json!({"structures": ["village"]}), "grounded");
        assert!(condition.is_satisfied_by(&position, &world));
        assert!(position.structures_resolved());
    }

    #[test]
    fn test_markers_and_nearby_blocks() {
        let FlatWorld { world, stone, .. } = flat_world(10);
        let condition = parse(
            json!({"markers": ["honey_log"], "needed_nearby_blocks": ["#base_stone"]}),
            "grounded",
        );
        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        assert_eq!(position.nearby_blocks(), &[stone]);
        assert!(!condition.is_satisfied_by(&position, &world));
        position.markers.push("honey_log".to_string());
        assert!(condition.is_satisfied_by(&position, &world));
    }

    #[test]
    fn test_seafloor_base_blocks() {
        let FlatWorld { world, sand, .. } = flat_world(10);
        let condition = parse(json!({"needed_base_blocks": ["sand"]}), "seafloor");
        let on = |base: BlockId| {
            with_data(
                BlockPos::new(0, 9, 0),
                PositionData::Seafloor(AreaInfo {
                    base_block: base,
                    height: 3,
                    nearby_blocks: vec![],
                }),
            )
        };
        assert!(condition.is_satisfied_by(&on(sand), &world));
        assert!(!condition.is_satisfied_by(&on(BlockId(1)), &world));
    }

    #[test]
    fn test_slime_chunk_flag() {
        let FlatWorld { world, .. } = flat_world(10);
        let condition = parse(json!({"is_slime_chunk": true}), "basic");
        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        let mut env = (*position.environment).clone();
        env.seed = 12345;
        position.environment = std::sync::Arc::new(env);
        // Chunk (0, -2) is a slime chunk for seed 12345; chunk (0, 0) is not.
        assert!(!condition.is_satisfied_by(&position, &world));
        position.pos = BlockPos::new(5, 9, -20);
        assert!(condition.is_satisfied_by(&position, &world));
    }
}
