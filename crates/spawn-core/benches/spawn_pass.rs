use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use spawn_config::{BucketConfig, SpawnerConfig};
use spawn_core::*;
use spawn_world::{BiomeDef, BiomeRegistry, BlockDef, BlockPos, BlockRegistry, ChunkPos, GridWorld};

fn world() -> GridWorld {
    let mut blocks = BlockRegistry::new();
    let stone = blocks.register(BlockDef::solid("stone")).unwrap();
    let mut biomes = BiomeRegistry::new();
    let plains = biomes
        .register(BiomeDef::new("plains", &["is_overworld"]))
        .unwrap();
    let mut world = GridWorld::new(blocks, biomes, 0, 64);
    world.load_area(ChunkPos::new(-2, -2), ChunkPos::new(2, 2));
    world.set_all_biomes(plains);
    world.fill(BlockPos::new(-32, 0, -32), BlockPos::new(47, 39, 47), stone);
    world
}

fn engine() -> BestSpawner {
    let mut config = SpawnerConfig::default();
    config.buckets = vec![BucketConfig::new("common", 100.0)];
    config.scheduling.minimum_distance_between_entities = 2.0;
    let mut engine = BestSpawner::new(config);
    let details: Vec<_> = (0..40)
        .map(|i| {
            json!({
                "id": format!("critter_{i}"), "entity": format!("critter_{i}"),
                "position_type": "grounded", "bucket": "common",
                "weight": 1.0 + i as f32, "level": "1-20",
                "conditions": [{"min_y": i % 8}]
            })
        })
        .collect();
    engine.load_detail_value(&json!(details), None).unwrap();
    engine
}

fn bench_zone_generation(c: &mut Criterion) {
    let world = world();
    let engine = engine();
    let input = ZoneInput::new(BlockPos::new(0, 32, 0), 16, 16, 16);
    c.bench_function("zone_generate_16", |bencher| {
        bencher.iter(|| {
            let cause = Arc::new(SpawnCause::new("bench", None));
            black_box(engine.generate(&world, black_box(&input), cause).unwrap())
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let world = world();
    let engine = engine();
    let input = ZoneInput::new(BlockPos::new(0, 32, 0), 16, 16, 16);
    let zone = engine
        .generate(&world, &input, Arc::new(SpawnCause::new("bench", None)))
        .unwrap();
    c.bench_function("resolve_positions_16", |bencher| {
        bencher.iter(|| black_box(engine.resolve(&world, &zone, &[])))
    });
}

fn bench_selection(c: &mut Criterion) {
    let world = world();
    let mut engine = engine();
    let input = ZoneInput::new(BlockPos::new(0, 32, 0), 16, 16, 16);
    let zone = engine
        .generate(&world, &input, Arc::new(SpawnCause::new("bench", None)))
        .unwrap();
    let positions = engine.resolve(&world, &zone, &[]);
    let bucket = SpawnBucket::new("common", 100.0);
    c.bench_function("select_8_of_256", |bencher| {
        bencher.iter(|| black_box(engine.select(&bucket, positions.clone(), 8, &world)))
    });
}

criterion_group!(benches, bench_zone_generation, bench_resolve, bench_selection);
criterion_main!(benches);
