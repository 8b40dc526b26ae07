//! Zone generation: an immutable snapshot of a world region.
//!
//! A [`SpawningZone`] holds block, light and sky-light data for every cell of
//! a cuboid, the highest sky-visible Y per column, the positions of living
//! entities around it, and every influence detected while scanning. It is
//! built once per pass and never mutated after.

use std::sync::Arc;

use glam::DVec3;
use rustc_hash::FxHashMap;
use spawn_world::{BiomeId, BlockId, BlockPos, BlockRegistry, ChunkPos, EntityId, WorldQuery};
use tracing::debug;

use crate::cause::SpawnCause;
use crate::error::ZoneError;
use crate::influence::{DetectorRegistry, ZoneInfluence};
use crate::position::Environment;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A cuboid request: origin plus extent along X (length), Y (height) and Z (width).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneInput {
    pub base: BlockPos,
    pub length: i32,
    pub height: i32,
    pub width: i32,
}

impl ZoneInput {
    pub fn new(base: BlockPos, length: i32, height: i32, width: i32) -> Self {
        Self {
            base,
            length,
            height,
            width,
        }
    }

    /// Geometric centre of the cuboid.
    pub fn center(&self) -> DVec3 {
        DVec3::new(
            self.base.x as f64 + self.length as f64 / 2.0,
            self.base.y as f64 + self.height as f64 / 2.0,
            self.base.z as f64 + self.width as f64 / 2.0,
        )
    }

    /// Block containing the centre.
    pub fn center_block(&self) -> BlockPos {
        BlockPos::from_dvec3(self.center())
    }

    /// Every chunk column the footprint touches.
    pub fn chunks(&self) -> Vec<ChunkPos> {
        let min = self.base.chunk();
        let max = self
            .base
            .offset(self.length.max(1) - 1, 0, self.width.max(1) - 1)
            .chunk();
        let mut chunks = Vec::new();
        for cx in min.x..=max.x {
            for cz in min.z..=max.z {
                chunks.push(ChunkPos::new(cx, cz));
            }
        }
        chunks
    }
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// One scanned cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockData {
    pub block: BlockId,
    pub light: u8,
    pub sky_light: u8,
}

/// Immutable region snapshot. All accessors take absolute world coordinates;
/// cells outside the region (or in columns whose chunk was not loaded) read
/// as `None`.
#[derive(Debug)]
pub struct SpawningZone {
    pub cause: Arc<SpawnCause>,
    pub environment: Arc<Environment>,
    pub base_x: i32,
    pub base_y: i32,
    pub base_z: i32,
    pub length: i32,
    pub height: i32,
    pub width: i32,
    /// Indexed `[x][y][z]`, flattened.
    cells: Vec<Option<BlockData>>,
    /// Lowest Y from which each column still sees the sky, indexed `[x][z]`.
    sky_levels: Vec<i32>,
    biomes: Vec<BiomeId>,
    /// Living entities around the region, excluding the cause entity.
    pub nearby_entities: Vec<(EntityId, DVec3)>,
    pub influences: Vec<ZoneInfluence>,
}

impl SpawningZone {
    fn local(&self, pos: BlockPos) -> Option<(usize, usize, usize)> {
        let lx = pos.x - self.base_x;
        let ly = pos.y - self.base_y;
        let lz = pos.z - self.base_z;
        if lx < 0 || ly < 0 || lz < 0 || lx >= self.length || ly >= self.height || lz >= self.width
        {
            return None;
        }
        Some((lx as usize, ly as usize, lz as usize))
    }

    fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.height as usize + y) * self.width as usize + z
    }

    fn column_index(&self, x: usize, z: usize) -> usize {
        x * self.width as usize + z
    }

    /// Whether `pos` lies inside the scanned cuboid.
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.local(pos).is_some()
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockData> {
        let (x, y, z) = self.local(pos)?;
        self.cells[self.cell_index(x, y, z)]
    }

    pub fn block(&self, pos: BlockPos) -> Option<BlockId> {
        self.get(pos).map(|data| data.block)
    }

    pub fn light(&self, pos: BlockPos, otherwise: u8) -> u8 {
        self.get(pos).map_or(otherwise, |data| data.light)
    }

    pub fn sky_light(&self, pos: BlockPos, otherwise: u8) -> u8 {
        self.get(pos).map_or(otherwise, |data| data.sky_light)
    }

    /// Sky visibility at `pos`, from the per-column sky level. Cells above the
    /// region see the sky when their column does at the top.
    pub fn can_see_sky(&self, pos: BlockPos) -> bool {
        let lx = pos.x - self.base_x;
        let lz = pos.z - self.base_z;
        if lx < 0 || lz < 0 || lx >= self.length || lz >= self.width {
            return false;
        }
        self.sky_levels[self.column_index(lx as usize, lz as usize)] <= pos.y
    }

    /// Lowest sky-visible Y of the column containing `pos`.
    pub fn sky_level(&self, pos: BlockPos) -> Option<i32> {
        let (x, _, z) = self.local(BlockPos::new(pos.x, self.base_y, pos.z))?;
        Some(self.sky_levels[self.column_index(x, z)])
    }

    pub fn biome(&self, pos: BlockPos) -> BiomeId {
        match self.local(BlockPos::new(pos.x, self.base_y, pos.z)) {
            Some((x, _, z)) => self.biomes[self.column_index(x, z)],
            None => BiomeId(0),
        }
    }

    /// Counts consecutive cells from `start` upward matching `condition`, up to `maximum`.
    pub fn height_space(
        &self,
        start: BlockPos,
        maximum: i32,
        condition: impl Fn(BlockId) -> bool,
    ) -> i32 {
        self.count_run(start, 1, maximum, condition)
    }

    /// Counts consecutive cells from `start` downward matching `condition`, up to `maximum`.
    pub fn depth_space(
        &self,
        start: BlockPos,
        maximum: i32,
        condition: impl Fn(BlockId) -> bool,
    ) -> i32 {
        self.count_run(start, -1, maximum, condition)
    }

    fn count_run(
        &self,
        start: BlockPos,
        step: i32,
        maximum: i32,
        condition: impl Fn(BlockId) -> bool,
    ) -> i32 {
        let mut count = 0;
        let mut pos = start;
        while count < maximum {
            match self.block(pos) {
                Some(block) if condition(block) => count += 1,
                _ => break,
            }
            pos = pos.offset(0, step, 0);
        }
        count
    }

    /// Distinct blocks within the box of the given radii around `center`.
    pub fn nearby_blocks(&self, center: BlockPos, horizontal: i32, vertical: i32) -> Vec<BlockId> {
        let mut found: Vec<BlockId> = Vec::new();
        for dx in -horizontal..=horizontal {
            for dy in -vertical..=vertical {
                for dz in -horizontal..=horizontal {
                    if let Some(block) = self.block(center.offset(dx, dy, dz))
                        && !found.contains(&block)
                    {
                        found.push(block);
                    }
                }
            }
        }
        found.sort();
        found
    }

    /// Influences detected in this zone that reach `pos`.
    pub fn influences_at(&self, pos: BlockPos) -> impl Iterator<Item = &ZoneInfluence> {
        self.influences.iter().filter(move |zi| zi.applies_to(pos))
    }

    /// Whether any tracked entity other than `except` is within `distance` of `point`.
    pub fn entity_within(&self, point: DVec3, distance: f64, except: Option<EntityId>) -> bool {
        self.nearby_entities
            .iter()
            .any(|(id, pos)| Some(*id) != except && pos.distance(point) < distance)
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Builds [`SpawningZone`] snapshots from a world.
#[derive(Debug, Clone)]
pub struct ZoneGenerator {
    /// Padding added to the region when collecting nearby entities.
    pub minimum_distance_between_entities: f64,
}

impl ZoneGenerator {
    pub fn new(minimum_distance_between_entities: f64) -> Self {
        Self {
            minimum_distance_between_entities,
        }
    }

    /// Snapshots the region described by `input`.
    ///
    /// # Errors
    ///
    /// [`ZoneError::InvalidHeight`] if clamping to build height leaves less
    /// than one layer, [`ZoneError::InvalidFootprint`] if length or width is
    /// below one.
    pub fn generate(
        &self,
        world: &dyn WorldQuery,
        input: &ZoneInput,
        cause: Arc<SpawnCause>,
        detectors: &DetectorRegistry,
    ) -> Result<SpawningZone, ZoneError> {
        if input.length < 1 || input.width < 1 {
            return Err(ZoneError::InvalidFootprint {
                length: input.length,
                width: input.width,
            });
        }
        let (base_y, height) = clamp_vertical(world, input.base.y, input.height)?;

        let nearby_entities = self.collect_entities(world, input, base_y, height, &cause);
        let blocks = world.blocks();

        let length = input.length as usize;
        let width = input.width as usize;
        let layers = height as usize;
        let mut cells = vec![None; length * layers * width];
        let mut sky_levels = vec![world.max_build_height(); length * width];
        let mut biomes = vec![BiomeId(0); length * width];
        let mut influences = Vec::new();
        let mut loaded: FxHashMap<ChunkPos, bool> = FxHashMap::default();

        let top = base_y + height - 1;
        for lx in 0..length {
            for lz in 0..width {
                let x = input.base.x + lx as i32;
                let z = input.base.z + lz as i32;
                let column = lx * width + lz;
                let chunk = BlockPos::new(x, top, z).chunk();
                if !*loaded
                    .entry(chunk)
                    .or_insert_with(|| world.is_chunk_loaded(chunk))
                {
                    continue;
                }

                biomes[column] = world.biome(BlockPos::new(x, base_y, z));
                let mut sees_sky = world.can_see_sky(BlockPos::new(x, top, z));
                for y in (base_y..=top).rev() {
                    let pos = BlockPos::new(x, y, z);
                    let block = world.block(pos);
                    let ly = (y - base_y) as usize;
                    cells[(lx * layers + ly) * width + lz] = Some(BlockData {
                        block,
                        light: world.light(pos),
                        sky_light: world.sky_light(pos),
                    });
                    for detector in detectors.iter() {
                        influences.extend(detector.detect_from_block(world, pos, block));
                    }
                    if sees_sky {
                        sky_levels[column] = y;
                    }
                    if blocks_sky(blocks, block) {
                        sees_sky = false;
                    }
                }
            }
        }

        let clamped = ZoneInput::new(
            BlockPos::new(input.base.x, base_y, input.base.z),
            input.length,
            height,
            input.width,
        );
        for detector in detectors.iter() {
            influences.extend(detector.detect_from_input(world, &clamped));
        }

        debug!(
            x = input.base.x,
            y = base_y,
            z = input.base.z,
            height,
            influences = influences.len(),
            entities = nearby_entities.len(),
            "zone generated"
        );

        Ok(SpawningZone {
            cause,
            environment: Arc::new(Environment::capture(world)),
            base_x: input.base.x,
            base_y,
            base_z: input.base.z,
            length: input.length,
            height,
            width: input.width,
            cells,
            sky_levels,
            biomes,
            nearby_entities,
            influences,
        })
    }

    fn collect_entities(
        &self,
        world: &dyn WorldQuery,
        input: &ZoneInput,
        base_y: i32,
        height: i32,
        cause: &SpawnCause,
    ) -> Vec<(EntityId, DVec3)> {
        let padding = self.minimum_distance_between_entities;
        let center = DVec3::new(
            input.base.x as f64 + input.length as f64 / 2.0,
            base_y as f64 + height as f64 / 2.0,
            input.base.z as f64 + input.width as f64 / 2.0,
        );
        let half = DVec3::new(
            input.length as f64 + padding,
            height as f64 + padding,
            input.width as f64 + padding,
        ) / 2.0;
        world
            .living_entities_in(center - half, center + half)
            .into_iter()
            .filter(|e| Some(e.id) != cause.entity)
            .map(|e| (e.id, e.position))
            .collect()
    }
}

/// Clamps `[base_y, base_y + height)` into the world's build range.
fn clamp_vertical(world: &dyn WorldQuery, base_y: i32, height: i32) -> Result<(i32, i32), ZoneError> {
    let mut y = base_y;
    let mut h = height;
    let min = world.min_build_height();
    let max = world.max_build_height();
    if y < min {
        h -= min - y;
        y = min;
    }
    if y + h > max {
        h = max - y;
    }
    if h < 1 {
        return Err(ZoneError::InvalidHeight {
            base_y,
            height: h,
        });
    }
    Ok((y, h))
}

/// Sky exposure ends at the first non-fluid block that does not let sky through.
fn blocks_sky(blocks: &BlockRegistry, block: BlockId) -> bool {
    let def = blocks.get(block);
    def.fluid.is_none() && !def.sees_sky
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
