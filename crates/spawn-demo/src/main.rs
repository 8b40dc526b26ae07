//! Runs the spawner over a small generated world and logs what appears.
//!
//! Configuration is loaded from `spawner.ron` and can be overridden via CLI
//! flags. Archetype documents are read from the config's details directory;
//! a built-in set is used when it holds none. Spawn rules come from the
//! rules directory, with a built-in fallback the same way.
//! Run with `cargo run -p spawn-demo -- --ticks 5000 --seed 7`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use glam::DVec3;
use serde_json::{Value, json};
use spawn_config::{CliArgs, SpawnerConfig, default_config_dir};
use spawn_core::position::SpawnablePosition;
use spawn_core::spawner::SnackSpawner;
use spawn_core::{
    BestSpawner, FishingCast, FixedAreaSpawner, SpawnRule, SpawnerManager, TriggerSpawner,
    ZoneInput, load_rules_dir, load_rules_value,
};
use spawn_world::{
    BaitEffect, BiomeDef, BiomeRegistry, BlockDef, BlockPos, BlockRegistry, ChunkPos, FluidKind,
    GridWorld, LivingEntity, PointOfInterest, RegistryError, WorldMut, WorldQuery,
};
use tracing::{info, warn};

const SURFACE: i32 = 64;
const CHUNK_RADIUS: i32 = 6;
const TICKS_PER_DAY: u64 = 24_000;

fn build_world(seed: i64) -> Result<GridWorld, RegistryError> {
    let mut blocks = BlockRegistry::new();
    let stone = blocks.register(BlockDef::solid("stone").with_tag("base_stone"))?;
    let grass = blocks.register(BlockDef::solid("grass_block").with_tag("dirt"))?;
    let water = blocks.register(BlockDef::fluid("water", FluidKind::Water))?;

    let mut biomes = BiomeRegistry::new();
    let plains = biomes.register(BiomeDef::new("plains", &["is_overworld", "is_grassland"]))?;
    let river = biomes.register(BiomeDef::new("river", &["is_overworld", "is_river"]))?;

    let mut world = GridWorld::new(blocks, biomes, -16, 128).with_seed(seed);
    world.load_area(
        ChunkPos::new(-CHUNK_RADIUS, -CHUNK_RADIUS),
        ChunkPos::new(CHUNK_RADIUS, CHUNK_RADIUS),
    );
    world.set_all_biomes(plains);

    let edge = CHUNK_RADIUS * 16;
    world.fill(BlockPos::new(-edge, -16, -edge), BlockPos::new(edge + 15, SURFACE - 2, edge + 15), stone);
    world.fill(
        BlockPos::new(-edge, SURFACE - 1, -edge),
        BlockPos::new(edge + 15, SURFACE - 1, edge + 15),
        grass,
    );

    // A river along z = 24..32.
    world.fill(BlockPos::new(-edge, SURFACE - 4, 24), BlockPos::new(edge + 15, SURFACE - 1, 31), water);
    for x in -edge..=edge + 15 {
        for z in 24..32 {
            world.set_biome(BlockPos::new(x, SURFACE - 1, z), river);
        }
    }
    world.add_structure("ruined_portal", BlockPos::new(-40, SURFACE - 4, -40), BlockPos::new(-30, SURFACE + 8, -30));
    world.add_point_of_interest(PointOfInterest {
        kind: "incense".to_string(),
        pos: BlockPos::new(-20, SURFACE, 10),
        tier: 0,
        effects: vec![BaitEffect {
            kind: "label".to_string(),
            subcategory: Some("fairy".to_string()),
            value: 4.0,
            chance: 1.0,
        }],
    });
    Ok(world)
}

fn builtin_details() -> Value {
    json!([
        {
            "id": "rabbit", "entity": "rabbit", "position_type": "grounded", "bucket": "common",
            "weight": 8.0, "level": "2-6", "labels": ["critter"],
            "conditions": [{"biomes": ["#is_grassland"], "can_see_sky": true}]
        },
        {
            "id": "fox", "entity": "fox", "position_type": "grounded", "bucket": "common",
            "weight": 3.0, "level": "4-10", "drops": "fox_drops",
            "held_items": [{"item": "sweet_berries", "percentage": 20.0}],
            "conditions": [{"time_range": "night"}]
        },
        {
            "id": "deer_herd", "type": "herd", "position_type": "grounded", "bucket": "uncommon",
            "weight": 2.0, "max_herd_size": 4, "min_distance_between_spawns": 2.0,
            "herdable": [
                {"entity": "stag", "level_range": "10-20", "max_times": 1, "is_leader": true},
                {"entity": "doe", "level_range": "8-16"}
            ]
        },
        {
            "id": "pixie", "entity": "pixie", "position_type": "grounded", "bucket": "rare",
            "weight": 1.0, "level": "15-25", "labels": ["fairy"]
        },
        {
            "id": "frog", "entity": "frog", "position_type": "surface", "bucket": "common",
            "weight": 4.0, "level": "3-8",
            "conditions": [{"fluid": "water"}]
        },
        {
            "id": "carp", "entity": "carp", "position_type": "fishing", "bucket": "common",
            "weight": 5.0, "level": "5-12"
        },
        {
            "id": "golden_carp", "entity": "carp", "position_type": "fishing", "bucket": "rare",
            "percentage": 1.0, "level": "20-30"
        }
    ])
}

fn load_content(engine: &mut BestSpawner, world: &GridWorld, config_dir: &std::path::Path) {
    let details_dir = engine.config().details_path(config_dir);
    match engine.load_details(&details_dir, Some(world.biomes())) {
        Ok(0) => {}
        Ok(count) => {
            info!("Loaded {count} spawn details from {}", details_dir.display());
            return;
        }
        Err(e) => warn!("Failed to load spawn details: {e}"),
    }
    match engine.load_detail_value(&builtin_details(), Some(world.biomes())) {
        Ok(count) => info!("Loaded {count} built-in spawn details"),
        Err(e) => warn!("Failed to load built-in spawn details: {e}"),
    }
}

fn builtin_rules() -> Value {
    json!([
        {
            "name": "fairies_favour_grassland",
            "components": [{
                "type": "weight",
                "detail": {"labels": ["fairy"]},
                "position": {"biomes": ["#is_grassland"]},
                "multiplier": 2.0
            }]
        },
        {
            "name": "nothing_in_caves",
            "components": [{"type": "location", "kinds": ["grounded"], "max_y": 40}]
        }
    ])
}

fn load_rules(world: &GridWorld, config_dir: &std::path::Path, config: &SpawnerConfig) -> Vec<SpawnRule> {
    let rules_dir = config.rules_path(config_dir);
    match load_rules_dir(&rules_dir, world.biomes()) {
        Ok(rules) if !rules.is_empty() => return rules,
        Ok(_) => {}
        Err(e) => warn!("Failed to load spawn rules: {e}"),
    }
    load_rules_value(&builtin_rules(), "built-in rules", world.biomes()).unwrap_or_else(|e| {
        warn!("Failed to load built-in spawn rules: {e}");
        Vec::new()
    })
}

fn season(position: &SpawnablePosition) -> Option<String> {
    let day = position.environment.game_time / TICKS_PER_DAY;
    let name = match (day / 7) % 4 {
        0 => "spring",
        1 => "summer",
        2 => "autumn",
        _ => "winter",
    };
    Some(name.to_string())
}

fn main() {
    let args = CliArgs::parse();

    let config_dir: PathBuf = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from("best-spawner"));

    let mut config = SpawnerConfig::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        SpawnerConfig::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    spawn_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let mut world = match build_world(config.scheduling.seed as i64) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("Failed to build world: {e}");
            std::process::exit(1);
        }
    };
    let mut engine = BestSpawner::new(config.clone());
    engine.hooks.set_season_resolver(Arc::new(season));
    load_content(&mut engine, &world, &config_dir);

    let mut manager = SpawnerManager::new();
    for rule in load_rules(&world, &config_dir, &config) {
        info!("Applying spawn rule `{}`", rule.name);
        manager.add_influence(Arc::new(rule));
    }
    manager.register(Box::new(FixedAreaSpawner::fixed(
        "meadow",
        ZoneInput::new(BlockPos::new(-24, SURFACE - 4, -24), 16, 12, 16),
        &config.scheduling,
    )));
    let snack = SnackSpawner::new(
        "snack",
        BlockPos::new(12, SURFACE, -12),
        vec![BaitEffect {
            kind: "rarity_bucket".to_string(),
            subcategory: None,
            value: 1.0,
            chance: 1.0,
        }],
        3,
        &config.scheduling,
        engine.rng(),
    );
    manager.register(Box::new(snack));

    world.add_entity(LivingEntity::player(DVec3::new(0.5, SURFACE as f64, 0.5)));
    manager.sync_players(&world, &config);

    let mut rod = TriggerSpawner::new("fishing_rod");
    let cast = FishingCast {
        rod: "fishing_rod".to_string(),
        lure_level: 1,
        ..FishingCast::default()
    };

    let mut placed = 0;
    for tick in 1..=args.ticks {
        world.advance(1);
        placed += manager.tick_all(&mut engine, &mut world);

        if tick % 20 == 0 {
            manager.sync_players(&world, engine.config());
        }
        if tick % 400 == 0 {
            let bobber = BlockPos::new(4, SURFACE - 1, 28);
            if let Some(result) = rod.cast(&mut engine, &mut world, None, cast.clone(), bobber, Vec::new()) {
                placed += result.entities.len();
            }
        }
        if tick % 1_000 == 0 {
            match engine.config().reload(&config_dir) {
                Ok(Some(new_config)) => {
                    engine.reload_config(new_config);
                    manager.sync_players(&world, engine.config());
                }
                Ok(None) => {}
                Err(e) => warn!("Config reload failed: {e}"),
            }
            info!(
                "Tick {tick}: {} spawners, {placed} entities placed",
                manager.len()
            );
        }
    }

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in world.entities().filter(|e| !e.is_player) {
        *by_type.entry(entity.entity_type.as_str()).or_default() += 1;
    }
    info!(
        "Finished {} ticks with {} living entities",
        args.ticks,
        world.living_entities_in(DVec3::splat(-1e6), DVec3::splat(1e6)).len()
    );
    for (entity_type, count) in by_type {
        info!("  {entity_type}: {count}");
    }
}
