//! Position calculators: per-kind scanning rules over a zone snapshot.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use spawn_config::ZoneConfig;
use spawn_world::{BlockId, BlockPos, BlockRegistry, FluidKind};

use super::{AreaInfo, FluidInfo, PositionData, PositionKind, SpawnablePosition};
use crate::error::LoadError;
use crate::zone::SpawningZone;

/// Everything a calculator sees for one zone cell.
pub struct CalculationInput<'a> {
    pub zone: &'a SpawningZone,
    pub blocks: &'a BlockRegistry,
    pub config: &'a ZoneConfig,
    /// Absolute coordinates of the cell under test.
    pub pos: BlockPos,
}

impl CalculationInput<'_> {
    fn block_at(&self, pos: BlockPos) -> Option<BlockId> {
        self.zone.block(pos)
    }

    /// Builds a position at the input cell with light and sky data read one
    /// block above it, where the entity will stand.
    fn position(&self, data: PositionData) -> SpawnablePosition {
        let above = self.pos.above();
        SpawnablePosition::new(
            self.zone.cause.clone(),
            self.zone.environment.clone(),
            self.pos,
            self.zone.biome(self.pos),
            self.zone.light(above, 0),
            self.zone.sky_light(above, 0),
            self.zone.can_see_sky(above),
            Vec::new(),
            data,
        )
    }

    fn nearby_blocks(&self) -> Vec<BlockId> {
        self.zone.nearby_blocks(
            self.pos,
            self.config.max_nearby_blocks_horizontal_range,
            self.config.max_nearby_blocks_vertical_range,
        )
    }
}

/// Scanning rule for one position kind.
pub trait PositionCalculator: Send + Sync {
    /// Registry key, e.g. `"grounded"`.
    fn name(&self) -> &str;

    fn kind(&self) -> PositionKind;

    /// Whether the cell qualifies. Cells outside the zone never fit.
    fn fits(&self, input: &CalculationInput) -> bool;

    /// Derives the position. Only called when [`fits`](Self::fits) returned `true`.
    fn calculate(&self, input: &CalculationInput) -> SpawnablePosition;
}

// ---------------------------------------------------------------------------
// Block requirements
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Requirement {
    Solid,
    AirLike,
    Fluid(FluidKind),
    AnyFluid,
}

impl Requirement {
    fn check(self, blocks: &BlockRegistry, block: BlockId) -> bool {
        let def = blocks.get(block);
        match self {
            Requirement::Solid => def.solid,
            Requirement::AirLike => def.is_air_like(),
            Requirement::Fluid(kind) => def.fluid == Some(kind),
            Requirement::AnyFluid => def.fluid.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Floored kinds
// ---------------------------------------------------------------------------

/// A solid floor with a particular medium above it: air for grounded, water
/// for seafloor, lava for lavafloor.
#[derive(Debug)]
pub struct FlooredCalculator {
    name: &'static str,
    kind: PositionKind,
    above: Requirement,
}

impl FlooredCalculator {
    pub const GROUNDED: FlooredCalculator = FlooredCalculator {
        name: "grounded",
        kind: PositionKind::Grounded,
        above: Requirement::AirLike,
    };
    pub const SEAFLOOR: FlooredCalculator = FlooredCalculator {
        name: "seafloor",
        kind: PositionKind::Seafloor,
        above: Requirement::Fluid(FluidKind::Water),
    };
    pub const LAVAFLOOR: FlooredCalculator = FlooredCalculator {
        name: "lavafloor",
        kind: PositionKind::Lavafloor,
        above: Requirement::Fluid(FluidKind::Lava),
    };
}

impl PositionCalculator for FlooredCalculator {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> PositionKind {
        self.kind
    }

    fn fits(&self, input: &CalculationInput) -> bool {
        let (Some(base), Some(above)) = (input.block_at(input.pos), input.block_at(input.pos.above()))
        else {
            return false;
        };
        Requirement::Solid.check(input.blocks, base) && self.above.check(input.blocks, above)
    }

    fn calculate(&self, input: &CalculationInput) -> SpawnablePosition {
        let above = self.above;
        let height = input.zone.height_space(
            input.pos.above(),
            input.config.max_vertical_space,
            |block| above.check(input.blocks, block),
        );
        let area = AreaInfo {
            base_block: input.block_at(input.pos).unwrap_or(BlockId::AIR),
            height,
            nearby_blocks: input.nearby_blocks(),
        };
        let data = match self.kind {
            PositionKind::Seafloor => PositionData::Seafloor(area),
            PositionKind::Lavafloor => PositionData::Lavafloor(area),
            _ => PositionData::Grounded(area),
        };
        input.position(data)
    }
}

// ---------------------------------------------------------------------------
// Fluid kinds
// ---------------------------------------------------------------------------

/// The top cell of a fluid body with open air above.
#[derive(Debug, Default)]
pub struct SurfaceCalculator;

impl PositionCalculator for SurfaceCalculator {
    fn name(&self) -> &str {
        "surface"
    }

    fn kind(&self) -> PositionKind {
        PositionKind::Surface
    }

    fn fits(&self, input: &CalculationInput) -> bool {
        let (Some(base), Some(above)) = (input.block_at(input.pos), input.block_at(input.pos.above()))
        else {
            return false;
        };
        Requirement::AnyFluid.check(input.blocks, base)
            && Requirement::AirLike.check(input.blocks, above)
    }

    fn calculate(&self, input: &CalculationInput) -> SpawnablePosition {
        let half = input.config.max_vertical_space / 2;
        let fluid_block = input.block_at(input.pos).unwrap_or(BlockId::AIR);
        let height = input.zone.height_space(input.pos.above(), half, |block| {
            Requirement::AirLike.check(input.blocks, block)
        });
        let depth = input.zone.depth_space(input.pos, half, |block| {
            Requirement::AnyFluid.check(input.blocks, block)
        });
        input.position(PositionData::Surface(
            AreaInfo {
                base_block: fluid_block,
                height,
                nearby_blocks: input.nearby_blocks(),
            },
            FluidInfo {
                fluid_block,
                is_source: input.blocks.get(fluid_block).fluid_source,
                depth,
            },
        ))
    }
}

/// A fluid cell with more fluid above it.
///
/// `depth` is the number of fluid cells between the position and the fluid
/// surface within the zone; `height` is the same run capped at
/// `max_vertical_space`.
#[derive(Debug, Default)]
pub struct SubmergedCalculator;

impl PositionCalculator for SubmergedCalculator {
    fn name(&self) -> &str {
        "submerged"
    }

    fn kind(&self) -> PositionKind {
        PositionKind::Submerged
    }

    fn fits(&self, input: &CalculationInput) -> bool {
        let (Some(base), Some(above)) = (input.block_at(input.pos), input.block_at(input.pos.above()))
        else {
            return false;
        };
        Requirement::AnyFluid.check(input.blocks, base)
            && Requirement::AnyFluid.check(input.blocks, above)
    }

    fn calculate(&self, input: &CalculationInput) -> SpawnablePosition {
        let fluid_block = input.block_at(input.pos).unwrap_or(BlockId::AIR);
        let is_fluid = |block: BlockId| Requirement::AnyFluid.check(input.blocks, block);
        let depth = input
            .zone
            .height_space(input.pos.above(), input.zone.height, is_fluid);
        let height = depth.min(input.config.max_vertical_space);
        input.position(PositionData::Submerged(
            AreaInfo {
                base_block: fluid_block,
                height,
                nearby_blocks: input.nearby_blocks(),
            },
            FluidInfo {
                fluid_block,
                is_source: input.blocks.get(fluid_block).fluid_source,
                depth,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Calculators keyed by name, in registration order.
pub struct CalculatorRegistry {
    calculators: Vec<Arc<dyn PositionCalculator>>,
    name_to_index: FxHashMap<String, usize>,
}

impl CalculatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            calculators: Vec::new(),
            name_to_index: FxHashMap::default(),
        }
    }

    /// Registry holding the five built-in area calculators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [Arc<dyn PositionCalculator>; 5] = [
            Arc::new(FlooredCalculator::GROUNDED),
            Arc::new(FlooredCalculator::SEAFLOOR),
            Arc::new(FlooredCalculator::LAVAFLOOR),
            Arc::new(SurfaceCalculator),
            Arc::new(SubmergedCalculator),
        ];
        for calculator in defaults {
            // Built-in names are distinct.
            let _ = registry.register(calculator);
        }
        registry
    }

    pub fn register(&mut self, calculator: Arc<dyn PositionCalculator>) -> Result<(), LoadError> {
        let name = calculator.name().to_string();
        if self.name_to_index.contains_key(&name) {
            return Err(LoadError::DuplicateKey(name));
        }
        self.name_to_index.insert(name, self.calculators.len());
        self.calculators.push(calculator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PositionCalculator>> {
        self.name_to_index.get(name).map(|&i| &self.calculators[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PositionCalculator>> {
        self.calculators.iter()
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
