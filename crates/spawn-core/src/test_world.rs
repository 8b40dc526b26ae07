//! Shared fixtures for unit tests.

use spawn_world::{
    BiomeDef, BiomeId, BiomeRegistry, BlockDef, BlockId, BlockPos, BlockRegistry, ChunkPos,
    FluidKind, GridWorld,
};

pub struct FlatWorld {
    pub world: GridWorld,
    pub stone: BlockId,
    pub sand: BlockId,
    pub water: BlockId,
    pub lava: BlockId,
    pub honey_log: BlockId,
    pub plains: BiomeId,
    pub ocean: BiomeId,
}

/// A world spanning `y` in `[0, 32)` with chunks `x` in `0..=1`, `z` in
/// `-1..=1` loaded, stone below `surface` and air above. Every column is
/// plains.
pub fn flat_world(surface: i32) -> FlatWorld {
    let mut blocks = BlockRegistry::new();
    let stone = blocks
        .register(BlockDef::solid("stone").with_tag("base_stone"))
        .unwrap();
    let sand = blocks.register(BlockDef::solid("sand")).unwrap();
    let water = blocks
        .register(BlockDef::fluid("water", FluidKind::Water))
        .unwrap();
    let lava = blocks
        .register(BlockDef::fluid("lava", FluidKind::Lava))
        .unwrap();
    let honey_log = blocks
        .register(BlockDef::solid("honeyed_oak_log").with_tag("honey_log"))
        .unwrap();

    let mut biomes = BiomeRegistry::new();
    let plains = biomes
        .register(BiomeDef::new("plains", &["is_overworld", "is_grassland"]))
        .unwrap();
    let ocean = biomes
        .register(BiomeDef::new("ocean", &["is_overworld", "is_ocean"]))
        .unwrap();

    let mut world = GridWorld::new(blocks, biomes, 0, 32).with_seed(12345);
    world.load_area(ChunkPos::new(0, -1), ChunkPos::new(1, 1));
    world.set_all_biomes(plains);
    if surface > 0 {
        world.fill(
            BlockPos::new(0, 0, -16),
            BlockPos::new(31, surface - 1, 31),
            stone,
        );
    }

    FlatWorld {
        world,
        stone,
        sand,
        water,
        lava,
        honey_log,
        plains,
        ocean,
    }
}
