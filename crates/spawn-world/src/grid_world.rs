//! In-memory world keyed by [`ChunkPos`].
//!
//! [`GridWorld`] owns loaded chunk columns in an
//! [`FxHashMap`](rustc_hash::FxHashMap), plus the entity, structure and
//! point-of-interest tables the spawner queries. It implements both
//! [`WorldQuery`] and [`WorldMut`].

use glam::DVec3;
use rustc_hash::FxHashMap;

use crate::biome::{BiomeId, BiomeRegistry};
use crate::coords::{BlockPos, CHUNK_WIDTH, ChunkPos};
use crate::query::{EntityId, LivingEntity, PointOfInterest, WorldMut, WorldQuery};
use crate::registry::{BlockId, BlockRegistry};

const TICKS_PER_DAY: u64 = 24_000;
const MAX_LIGHT: u8 = 15;

/// One loaded chunk column: block IDs for every cell and a biome per column.
#[derive(Clone, Debug)]
struct ChunkColumn {
    blocks: Vec<BlockId>,
    biomes: Vec<BiomeId>,
}

impl ChunkColumn {
    fn new(height: usize, biome: BiomeId) -> Self {
        let area = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;
        Self {
            blocks: vec![BlockId::AIR; area * height],
            biomes: vec![biome; area],
        }
    }
}

/// A named structure occupying an inclusive block box.
#[derive(Clone, Debug)]
struct StructureBounds {
    name: String,
    min: BlockPos,
    max: BlockPos,
}

/// Chunk-keyed in-memory world.
pub struct GridWorld {
    blocks: BlockRegistry,
    biomes: BiomeRegistry,
    dimension: String,
    seed: i64,
    min_y: i32,
    max_y: i32,
    chunks: FxHashMap<ChunkPos, ChunkColumn>,
    structures: Vec<StructureBounds>,
    points_of_interest: Vec<PointOfInterest>,
    entities: FxHashMap<EntityId, LivingEntity>,
    next_entity_id: u64,
    game_time: u64,
    raining: bool,
    thundering: bool,
}

impl GridWorld {
    /// Creates an empty world spanning `[min_y, max_y)` vertically.
    pub fn new(blocks: BlockRegistry, biomes: BiomeRegistry, min_y: i32, max_y: i32) -> Self {
        Self {
            blocks,
            biomes,
            dimension: "overworld".to_string(),
            seed: 0,
            min_y,
            max_y: max_y.max(min_y + 1),
            chunks: FxHashMap::default(),
            structures: Vec::new(),
            points_of_interest: Vec::new(),
            entities: FxHashMap::default(),
            next_entity_id: 1,
            game_time: 0,
            raining: false,
            thundering: false,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_dimension(mut self, dimension: &str) -> Self {
        self.dimension = dimension.to_string();
        self
    }

    fn height(&self) -> usize {
        (self.max_y - self.min_y) as usize
    }

    /// Loads an empty (all air) chunk column. Reloading resets the column.
    pub fn load_chunk(&mut self, chunk: ChunkPos) {
        let column = ChunkColumn::new(self.height(), BiomeId(0));
        self.chunks.insert(chunk, column);
    }

    /// Loads every chunk in the inclusive chunk range.
    pub fn load_area(&mut self, min: ChunkPos, max: ChunkPos) {
        for cx in min.x..=max.x {
            for cz in min.z..=max.z {
                self.load_chunk(ChunkPos::new(cx, cz));
            }
        }
    }

    pub fn unload_chunk(&mut self, chunk: ChunkPos) -> bool {
        self.chunks.remove(&chunk).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    fn cell_index(&self, pos: BlockPos) -> Option<(ChunkPos, usize)> {
        if pos.y < self.min_y || pos.y >= self.max_y {
            return None;
        }
        let chunk = pos.chunk();
        let lx = (pos.x - chunk.min_block_x()) as usize;
        let lz = (pos.z - chunk.min_block_z()) as usize;
        let ly = (pos.y - self.min_y) as usize;
        let width = CHUNK_WIDTH as usize;
        Some((chunk, (ly * width + lz) * width + lx))
    }

    fn column_index(pos: BlockPos) -> usize {
        let chunk = pos.chunk();
        let lx = (pos.x - chunk.min_block_x()) as usize;
        let lz = (pos.z - chunk.min_block_z()) as usize;
        lz * CHUNK_WIDTH as usize + lx
    }

    /// Fills the inclusive box `[min, max]` with `block`. Cells in unloaded
    /// chunks are skipped.
    pub fn fill(&mut self, min: BlockPos, max: BlockPos, block: BlockId) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(BlockPos::new(x, y, z), block);
                }
            }
        }
    }

    /// Sets the biome of the column containing `pos`.
    pub fn set_biome(&mut self, pos: BlockPos, biome: BiomeId) {
        let index = Self::column_index(pos);
        if let Some(column) = self.chunks.get_mut(&pos.chunk()) {
            column.biomes[index] = biome;
        }
    }

    /// Sets the biome of every column of every loaded chunk.
    pub fn set_all_biomes(&mut self, biome: BiomeId) {
        for column in self.chunks.values_mut() {
            column.biomes.fill(biome);
        }
    }

    pub fn add_structure(&mut self, name: &str, min: BlockPos, max: BlockPos) {
        self.structures.push(StructureBounds {
            name: name.to_string(),
            min,
            max,
        });
    }

    pub fn add_point_of_interest(&mut self, poi: PointOfInterest) {
        self.points_of_interest.push(poi);
    }

    pub fn set_game_time(&mut self, ticks: u64) {
        self.game_time = ticks;
    }

    /// Advances the world clock by `ticks`.
    pub fn advance(&mut self, ticks: u64) {
        self.game_time += ticks;
    }

    pub fn set_weather(&mut self, raining: bool, thundering: bool) {
        self.raining = raining;
        self.thundering = thundering;
    }

    /// Number of living entities, players included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterates over every living entity.
    pub fn entities(&self) -> impl Iterator<Item = &LivingEntity> {
        self.entities.values()
    }

    fn block_light(&self, pos: BlockPos) -> u8 {
        let own = self.blocks.get(self.block(pos)).light_emission;
        let neighbors = [
            pos.above(),
            pos.below(),
            pos.offset(1, 0, 0),
            pos.offset(-1, 0, 0),
            pos.offset(0, 0, 1),
            pos.offset(0, 0, -1),
        ];
        neighbors
            .iter()
            .map(|n| self.blocks.get(self.block(*n)).light_emission.saturating_sub(1))
            .fold(own, u8::max)
    }
}

impl WorldQuery for GridWorld {
    fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    fn biomes(&self) -> &BiomeRegistry {
        &self.biomes
    }

    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn seed(&self) -> i64 {
        self.seed
    }

    fn min_build_height(&self) -> i32 {
        self.min_y
    }

    fn max_build_height(&self) -> i32 {
        self.max_y
    }

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.chunks.contains_key(&chunk)
    }

    fn block(&self, pos: BlockPos) -> BlockId {
        match self.cell_index(pos) {
            Some((chunk, index)) => self
                .chunks
                .get(&chunk)
                .map_or(BlockId::AIR, |column| column.blocks[index]),
            None => BlockId::AIR,
        }
    }

    fn light(&self, pos: BlockPos) -> u8 {
        self.sky_light(pos).max(self.block_light(pos))
    }

    fn sky_light(&self, pos: BlockPos) -> u8 {
        if self.can_see_sky(pos) { MAX_LIGHT } else { 0 }
    }

    fn can_see_sky(&self, pos: BlockPos) -> bool {
        ((pos.y + 1).max(self.min_y)..self.max_y).all(|y| {
            let def = self.blocks.get(self.block(BlockPos::new(pos.x, y, pos.z)));
            def.sees_sky || def.fluid.is_some()
        })
    }

    fn biome(&self, pos: BlockPos) -> BiomeId {
        self.chunks
            .get(&pos.chunk())
            .map_or(BiomeId(0), |column| column.biomes[Self::column_index(pos)])
    }

    fn structures_at(&self, pos: BlockPos) -> Vec<String> {
        self.structures
            .iter()
            .filter(|s| {
                (s.min.x..=s.max.x).contains(&pos.x)
                    && (s.min.y..=s.max.y).contains(&pos.y)
                    && (s.min.z..=s.max.z).contains(&pos.z)
            })
            .map(|s| s.name.clone())
            .collect()
    }

    fn points_of_interest(&self, kind: &str, center: BlockPos, radius: i32) -> Vec<PointOfInterest> {
        let radius_sq = (radius as f64) * (radius as f64);
        self.points_of_interest
            .iter()
            .filter(|poi| poi.kind == kind && poi.pos.distance_sq(center) <= radius_sq)
            .cloned()
            .collect()
    }

    fn living_entities_in(&self, min: DVec3, max: DVec3) -> Vec<LivingEntity> {
        let mut found: Vec<LivingEntity> = self
            .entities
            .values()
            .filter(|e| e.position.cmpge(min).all() && e.position.cmple(max).all())
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }

    fn entity(&self, id: EntityId) -> Option<&LivingEntity> {
        self.entities.get(&id)
    }

    fn players(&self) -> Vec<LivingEntity> {
        let mut players: Vec<LivingEntity> =
            self.entities.values().filter(|e| e.is_player).cloned().collect();
        players.sort_by_key(|e| e.id);
        players
    }

    fn game_time(&self) -> u64 {
        self.game_time
    }

    fn day_time(&self) -> u64 {
        self.game_time % TICKS_PER_DAY
    }

    fn is_raining(&self) -> bool {
        self.raining
    }

    fn is_thundering(&self) -> bool {
        self.thundering
    }

    fn moon_phase(&self) -> u8 {
        ((self.game_time / TICKS_PER_DAY) % 8) as u8
    }
}

impl WorldMut for GridWorld {
    fn add_entity(&mut self, mut entity: LivingEntity) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        entity.id = id;
        tracing::trace!(id = id.0, kind = %entity.entity_type, "entity added");
        self.entities.insert(id, entity);
        id
    }

    fn remove_entity(&mut self, id: EntityId) -> Option<LivingEntity> {
        self.entities.remove(&id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut LivingEntity> {
        self.entities.get_mut(&id)
    }

    fn set_block(&mut self, pos: BlockPos, block: BlockId) {
        if let Some((chunk, index)) = self.cell_index(pos)
            && let Some(column) = self.chunks.get_mut(&chunk)
        {
            column.blocks[index] = block;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeDef;
    use crate::registry::{BlockDef, FluidKind};

    fn world() -> (GridWorld, BlockId, BlockId) {
        let mut blocks = BlockRegistry::new();
        let stone = blocks.register(BlockDef::solid("stone")).unwrap();
        let water = blocks
            .register(BlockDef::fluid("water", FluidKind::Water))
            .unwrap();
        let mut biomes = BiomeRegistry::new();
        biomes.register(BiomeDef::new("plains", &[])).unwrap();
        let mut world = GridWorld::new(blocks, biomes, 0, 32);
        world.load_chunk(ChunkPos::new(0, 0));
        (world, stone, water)
    }

    #[test]
    fn test_set_then_get_block() {
        let (mut world, stone, _) = world();
        world.set_block(BlockPos::new(3, 4, 5), stone);
        assert_eq!(world.block(BlockPos::new(3, 4, 5)), stone);
        assert_eq!(world.block(BlockPos::new(3, 5, 5)), BlockId::AIR);
    }

    #[test]
    fn test_unloaded_chunk_reads_air() {
        let (mut world, stone, _) = world();
        world.set_block(BlockPos::new(20, 4, 5), stone);
        assert!(!world.is_chunk_loaded(ChunkPos::new(1, 0)));
        assert_eq!(world.block(BlockPos::new(20, 4, 5)), BlockId::AIR);
    }

    #[test]
    fn test_sky_visibility_through_water() {
        let (mut world, stone, water) = world();
        world.fill(BlockPos::new(0, 10, 0), BlockPos::new(0, 12, 0), water);
        assert!(world.can_see_sky(BlockPos::new(0, 9, 0)));
        world.set_block(BlockPos::new(0, 20, 0), stone);
        assert!(!world.can_see_sky(BlockPos::new(0, 9, 0)));
        assert_eq!(world.sky_light(BlockPos::new(0, 9, 0)), 0);
        assert_eq!(world.sky_light(BlockPos::new(0, 21, 0)), 15);
    }

    #[test]
    fn test_entities_in_box() {
        let (mut world, _, _) = world();
        let near = world.add_entity(LivingEntity::creature("a", DVec3::new(1.0, 5.0, 1.0)));
        world.add_entity(LivingEntity::creature("b", DVec3::new(30.0, 5.0, 1.0)));
        let found = world.living_entities_in(DVec3::ZERO, DVec3::splat(10.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near);
    }

    #[test]
    fn test_time_and_moon_phase() {
        let (mut world, _, _) = world();
        world.set_game_time(24_000 * 3 + 6_000);
        assert_eq!(world.day_time(), 6_000);
        assert_eq!(world.moon_phase(), 3);
    }

    #[test]
    fn test_structure_bounds_inclusive() {
        let (mut world, _, _) = world();
        world.add_structure("village", BlockPos::new(0, 0, 0), BlockPos::new(4, 4, 4));
        assert_eq!(world.structures_at(BlockPos::new(4, 4, 4)), vec!["village"]);
        assert!(world.structures_at(BlockPos::new(5, 4, 4)).is_empty());
    }
}
