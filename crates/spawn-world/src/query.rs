//! The interface the spawner uses to read from, and add entities to, a world.
//!
//! The spawner never owns world storage. Everything it needs (blocks, light,
//! biomes, structures, points of interest, living entities, time and weather)
//! is read through [`WorldQuery`]; realized spawns go through [`WorldMut`].

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::biome::{BiomeId, BiomeRegistry};
use crate::coords::{BlockPos, ChunkPos};
use crate::registry::{BlockId, BlockRegistry};

/// Identifier of a living entity in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// A living entity as seen by the spawner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LivingEntity {
    pub id: EntityId,
    /// Archetype name, e.g. the species a spawn detail produced.
    pub entity_type: String,
    pub position: DVec3,
    pub level: u32,
    pub held_item: Option<String>,
    pub drop_table: Option<String>,
    pub aspects: Vec<String>,
    /// Players anchor player spawners and never count toward density caps.
    pub is_player: bool,
}

impl LivingEntity {
    /// A player entity at `position`.
    pub fn player(position: DVec3) -> Self {
        Self {
            id: EntityId(0),
            entity_type: "player".to_string(),
            position,
            level: 0,
            held_item: None,
            drop_table: None,
            aspects: Vec::new(),
            is_player: true,
        }
    }

    /// A non-player entity of the given type at `position`.
    pub fn creature(entity_type: &str, position: DVec3) -> Self {
        Self {
            id: EntityId(0),
            entity_type: entity_type.to_string(),
            position,
            level: 1,
            held_item: None,
            drop_table: None,
            aspects: Vec::new(),
            is_player: false,
        }
    }
}

/// One effect carried by a bait or lure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaitEffect {
    /// Effect kind, interpreted by the spawner (e.g. "label", "level", "aspect").
    pub kind: String,
    /// Optional qualifier, such as the label a weight boost applies to.
    pub subcategory: Option<String>,
    pub value: f64,
    /// Probability in `[0, 1]` that the effect fires on a spawn.
    pub chance: f64,
}

/// A registered point of interest such as a lure block or an incense burner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub kind: String,
    pub pos: BlockPos,
    /// Lure tier of the source; 0 when it has none.
    pub tier: u8,
    pub effects: Vec<BaitEffect>,
}

/// Read access to a world.
pub trait WorldQuery {
    fn blocks(&self) -> &BlockRegistry;
    fn biomes(&self) -> &BiomeRegistry;
    fn dimension(&self) -> &str;
    fn seed(&self) -> i64;

    /// Lowest buildable Y (inclusive).
    fn min_build_height(&self) -> i32;
    /// Highest buildable Y (exclusive).
    fn max_build_height(&self) -> i32;

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool;

    /// Block at `pos`; air outside loaded chunks or build height.
    fn block(&self, pos: BlockPos) -> BlockId;
    /// Combined block and sky light at `pos`.
    fn light(&self, pos: BlockPos) -> u8;
    fn sky_light(&self, pos: BlockPos) -> u8;
    /// Sky visibility from `pos`, looking through fluids.
    fn can_see_sky(&self, pos: BlockPos) -> bool;
    fn biome(&self, pos: BlockPos) -> BiomeId;

    /// Names of structures whose bounds contain `pos`.
    fn structures_at(&self, pos: BlockPos) -> Vec<String>;
    /// Points of interest of `kind` within `radius` blocks of `center`.
    fn points_of_interest(&self, kind: &str, center: BlockPos, radius: i32) -> Vec<PointOfInterest>;

    /// Living entities inside the axis-aligned box `[min, max]`.
    fn living_entities_in(&self, min: DVec3, max: DVec3) -> Vec<LivingEntity>;
    fn entity(&self, id: EntityId) -> Option<&LivingEntity>;
    fn players(&self) -> Vec<LivingEntity>;

    /// Ticks since the world started.
    fn game_time(&self) -> u64;
    /// Time of day in ticks, `[0, 24000)`.
    fn day_time(&self) -> u64;
    fn is_raining(&self) -> bool;
    fn is_thundering(&self) -> bool;
    /// Moon phase in `[0, 8)`.
    fn moon_phase(&self) -> u8;
}

/// Write access used when a spawn is realized.
pub trait WorldMut: WorldQuery {
    /// Places a living entity and returns its assigned ID.
    fn add_entity(&mut self, entity: LivingEntity) -> EntityId;
    fn remove_entity(&mut self, id: EntityId) -> Option<LivingEntity>;
    /// Mutable access to a placed entity, for changes made after spawning.
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut LivingEntity>;
    fn set_block(&mut self, pos: BlockPos, block: BlockId);
}
