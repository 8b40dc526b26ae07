//! Spawn rules: data-driven edits to what the loaded details may do.
//!
//! A rule document is `{"name": ..., "enabled": true, "components": [...]}`,
//! and a file holds one rule or an array of them. Each component is tagged
//! by `type`:
//!
//! - `filter` allows or denies details matching its `detail` selector at
//!   positions matching its `position` selector. Unmatched pairs pass.
//! - `weight` multiplies the weight of matching details at matching
//!   positions.
//! - `location` allows or vetoes deriving positions of the listed kinds and
//!   biomes inside an optional `min_y..=max_y` band.
//!
//! A loaded [`SpawnRule`] is a [`SpawningInfluence`]; register it on the
//! [`SpawnerManager`](crate::spawner::SpawnerManager) to apply it to every
//! spawner.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::Value;
use spawn_world::{BiomeId, BiomeRegistry, BlockPos, WorldQuery};
use tracing::{debug, error, info, warn};

use crate::detail::{SpawnDetail, collect_json_files};
use crate::error::LoadError;
use crate::influence::SpawningInfluence;
use crate::position::{PositionKind, SpawnablePosition};

/// Picks details. Each non-empty list must contain a match; empty lists
/// match everything.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetailSelector {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub buckets: Vec<String>,
}

impl DetailSelector {
    pub fn selects(&self, detail: &SpawnDetail) -> bool {
        (self.ids.is_empty() || self.ids.contains(&detail.id))
            && (self.labels.is_empty() || self.labels.iter().any(|l| detail.has_label(l)))
            && (self.buckets.is_empty() || self.buckets.contains(&detail.bucket))
    }
}

/// Position kinds by name and biomes by name or `#tag`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct PositionDocument {
    kinds: Vec<String>,
    biomes: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ComponentDocument {
    Filter {
        #[serde(default)]
        detail: DetailSelector,
        #[serde(default)]
        position: PositionDocument,
        #[serde(default)]
        allow: bool,
    },
    Weight {
        #[serde(default)]
        detail: DetailSelector,
        #[serde(default)]
        position: PositionDocument,
        multiplier: f32,
    },
    Location {
        #[serde(default)]
        kinds: Vec<String>,
        #[serde(default)]
        biomes: Vec<String>,
        #[serde(default)]
        min_y: Option<i32>,
        #[serde(default)]
        max_y: Option<i32>,
        #[serde(default)]
        allow: bool,
    },
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
struct RuleDocument {
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    components: Vec<ComponentDocument>,
}

/// A position selector resolved against a biome registry.
#[derive(Clone, Debug, Default)]
pub struct PositionSelector {
    kinds: FxHashSet<PositionKind>,
    /// `None` matches every biome.
    biomes: Option<FxHashSet<BiomeId>>,
}

impl PositionSelector {
    fn compile(
        document: &PositionDocument,
        registry: &BiomeRegistry,
        rule: &str,
    ) -> Result<Self, LoadError> {
        let kinds = document
            .kinds
            .iter()
            .map(|name| {
                PositionKind::from_name(name)
                    .ok_or_else(|| LoadError::UnknownPositionType(name.clone()))
            })
            .collect::<Result<FxHashSet<_>, _>>()?;
        let biomes = (!document.biomes.is_empty()).then(|| {
            let resolved: FxHashSet<BiomeId> = registry
                .iter()
                .filter(|(_, def)| document.biomes.iter().any(|pattern| def.matches(pattern)))
                .map(|(id, _)| id)
                .collect();
            if resolved.is_empty() {
                warn!("Spawn rule `{rule}`: biomes {:?} match nothing", document.biomes);
            }
            resolved
        });
        Ok(Self { kinds, biomes })
    }

    pub fn matches(&self, kind: PositionKind, biome: BiomeId) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&kind))
            && self.biomes.as_ref().is_none_or(|biomes| biomes.contains(&biome))
    }

    fn selects(&self, position: &SpawnablePosition) -> bool {
        self.matches(position.kind(), position.biome)
    }
}

#[derive(Clone, Debug)]
pub enum RuleComponent {
    Filter {
        detail: DetailSelector,
        position: PositionSelector,
        allow: bool,
    },
    Weight {
        detail: DetailSelector,
        position: PositionSelector,
        multiplier: f32,
    },
    Location {
        position: PositionSelector,
        min_y: Option<i32>,
        max_y: Option<i32>,
        allow: bool,
    },
}

impl RuleComponent {
    fn compile(
        document: &ComponentDocument,
        registry: &BiomeRegistry,
        rule: &str,
    ) -> Result<Self, LoadError> {
        Ok(match document {
            ComponentDocument::Filter {
                detail,
                position,
                allow,
            } => RuleComponent::Filter {
                detail: detail.clone(),
                position: PositionSelector::compile(position, registry, rule)?,
                allow: *allow,
            },
            ComponentDocument::Weight {
                detail,
                position,
                multiplier,
            } => {
                if !multiplier.is_finite() || *multiplier < 0.0 {
                    return Err(LoadError::InvalidRule {
                        name: rule.to_string(),
                        reason: format!("weight multiplier {multiplier} must be non-negative"),
                    });
                }
                RuleComponent::Weight {
                    detail: detail.clone(),
                    position: PositionSelector::compile(position, registry, rule)?,
                    multiplier: *multiplier,
                }
            }
            ComponentDocument::Location {
                kinds,
                biomes,
                min_y,
                max_y,
                allow,
            } => {
                if let (Some(min), Some(max)) = (min_y, max_y)
                    && min > max
                {
                    return Err(LoadError::InvalidRule {
                        name: rule.to_string(),
                        reason: format!("min_y {min} is above max_y {max}"),
                    });
                }
                let position = PositionDocument {
                    kinds: kinds.clone(),
                    biomes: biomes.clone(),
                };
                RuleComponent::Location {
                    position: PositionSelector::compile(&position, registry, rule)?,
                    min_y: *min_y,
                    max_y: *max_y,
                    allow: *allow,
                }
            }
        })
    }
}

/// A named set of rule components, applied as an influence.
#[derive(Clone, Debug)]
pub struct SpawnRule {
    pub name: String,
    pub components: Vec<RuleComponent>,
}

impl SpawnRule {
    /// Parses one rule document. Returns `Ok(None)` for a disabled rule.
    pub fn parse(value: &Value, registry: &BiomeRegistry) -> Result<Option<Self>, LoadError> {
        let document = RuleDocument::deserialize(value).map_err(|source| LoadError::Json {
            context: format!(
                "spawn rule `{}`",
                value.get("name").and_then(Value::as_str).unwrap_or("<unnamed>")
            ),
            source,
        })?;
        if !document.enabled {
            debug!("Skipping disabled spawn rule `{}`", document.name);
            return Ok(None);
        }
        let components = document
            .components
            .iter()
            .map(|c| RuleComponent::compile(c, registry, &document.name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Self {
            name: document.name,
            components,
        }))
    }
}

impl SpawningInfluence for SpawnRule {
    fn affect_spawnable(&self, detail: &SpawnDetail, position: &SpawnablePosition) -> bool {
        self.components.iter().all(|component| match component {
            RuleComponent::Filter {
                detail: selector,
                position: at,
                allow,
            } if selector.selects(detail) && at.selects(position) => *allow,
            _ => true,
        })
    }

    fn affect_weight(&self, detail: &SpawnDetail, position: &SpawnablePosition, weight: f32) -> f32 {
        self.components
            .iter()
            .fold(weight, |weight, component| match component {
                RuleComponent::Weight {
                    detail: selector,
                    position: at,
                    multiplier,
                } if selector.selects(detail) && at.selects(position) => weight * multiplier,
                _ => weight,
            })
    }

    fn is_allowed_position(&self, world: &dyn WorldQuery, pos: BlockPos, kind: PositionKind) -> bool {
        self.components.iter().all(|component| match component {
            RuleComponent::Location {
                position,
                min_y,
                max_y,
                allow,
            } => {
                let in_band = min_y.is_none_or(|min| pos.y >= min)
                    && max_y.is_none_or(|max| pos.y <= max);
                if in_band && position.matches(kind, world.biome(pos)) {
                    *allow
                } else {
                    true
                }
            }
            _ => true,
        })
    }
}

/// Parses a rule object or an array of them. Invalid rules are logged and
/// left out; an unknown position kind aborts.
pub fn load_rules_value(
    value: &Value,
    source: &str,
    registry: &BiomeRegistry,
) -> Result<Vec<SpawnRule>, LoadError> {
    let documents: &[Value] = match value {
        Value::Array(items) => items,
        Value::Object(_) => std::slice::from_ref(value),
        _ => {
            error!("{source}: expected a rule object or array");
            return Ok(Vec::new());
        }
    };
    let mut rules = Vec::new();
    for document in documents {
        match SpawnRule::parse(document, registry) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => error!("{source}: {e}"),
        }
    }
    Ok(rules)
}

/// Loads every `.json` rule file under `dir`, in path order. A missing
/// directory loads nothing.
pub fn load_rules_dir(dir: &Path, registry: &BiomeRegistry) -> Result<Vec<SpawnRule>, LoadError> {
    if !dir.is_dir() {
        debug!("Spawn rule directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    collect_json_files(dir, &mut files)?;
    files.sort();

    let mut rules = Vec::new();
    for file in &files {
        let contents = fs::read_to_string(file).map_err(|source| LoadError::Io {
            path: file.clone(),
            source,
        })?;
        let source = file.display().to_string();
        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => rules.extend(load_rules_value(&value, &source, registry)?),
            Err(e) => error!("{source}: invalid JSON: {e}"),
        }
    }
    info!("Loaded {} spawn rules from {}", rules.len(), dir.display());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::SpawnBucket;
    use crate::detail::SpawnPool;
    use crate::detail::test_support::detail;
    use crate::position::test_support::grounded_at;
    use crate::selector::SpawningSelector;
    use crate::test_world::{FlatWorld, flat_world};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;
    use std::sync::Arc;

    fn rule(value: Value) -> SpawnRule {
        let FlatWorld { world, .. } = flat_world(10);
        SpawnRule::parse(&value, world.biomes()).unwrap().unwrap()
    }

    fn ember() -> Arc<SpawnDetail> {
        detail(json!({
            "id": "ember", "entity": "ember", "position_type": "grounded",
            "bucket": "rare", "weight": 1.0, "labels": ["fire"]
        }))
    }

    fn rabbit() -> Arc<SpawnDetail> {
        detail(json!({
            "id": "rabbit", "entity": "rabbit", "position_type": "grounded",
            "bucket": "common", "weight": 1.0
        }))
    }

    #[test]
    fn test_filter_denies_only_matching_pairs() {
        let no_fire = rule(json!({
            "name": "no_fire_on_grass",
            "components": [{
                "type": "filter",
                "detail": {"labels": ["fire"]},
                "position": {"kinds": ["grounded"], "biomes": ["#is_grassland"]}
            }]
        }));
        let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
        let FlatWorld { plains, ocean, .. } = flat_world(10);

        position.biome = plains;
        assert!(!no_fire.affect_spawnable(&ember(), &position));
        assert!(no_fire.affect_spawnable(&rabbit(), &position));

        position.biome = ocean;
        assert!(no_fire.affect_spawnable(&ember(), &position));
    }

    #[test]
    fn test_weight_components_compound() {
        let tweak = rule(json!({
            "name": "rare_is_rarer",
            "components": [
                {"type": "weight", "detail": {"buckets": ["rare"]}, "multiplier": 0.5},
                {"type": "weight", "detail": {"ids": ["ember", "rabbit"]}, "multiplier": 3.0}
            ]
        }));
        let position = grounded_at(BlockPos::new(0, 9, 0), 4);
        assert_eq!(tweak.affect_weight(&ember(), &position, 2.0), 3.0);
        assert_eq!(tweak.affect_weight(&rabbit(), &position, 2.0), 6.0);
    }

    #[test]
    fn test_location_vetoes_band() {
        let FlatWorld { mut world, ocean, .. } = flat_world(10);
        let shallow = rule(json!({
            "name": "nothing_underground",
            "components": [{"type": "location", "kinds": ["grounded"], "max_y": 5}]
        }));
        assert!(!shallow.is_allowed_position(&world, BlockPos::new(0, 3, 0), PositionKind::Grounded));
        assert!(shallow.is_allowed_position(&world, BlockPos::new(0, 9, 0), PositionKind::Grounded));
        assert!(shallow.is_allowed_position(&world, BlockPos::new(0, 3, 0), PositionKind::Surface));

        let dry = rule(json!({
            "name": "no_ocean",
            "components": [{"type": "location", "biomes": ["ocean"]}]
        }));
        assert!(dry.is_allowed_position(&world, BlockPos::new(0, 9, 0), PositionKind::Grounded));
        world.set_all_biomes(ocean);
        assert!(!dry.is_allowed_position(&world, BlockPos::new(0, 9, 0), PositionKind::Grounded));
    }

    #[test]
    fn test_rule_keeps_detail_out_of_selection() {
        let FlatWorld { world, .. } = flat_world(10);
        let mut pool = SpawnPool::new(&[SpawnBucket::new("common", 90.0), SpawnBucket::new("rare", 10.0)]);
        pool.insert((*detail(json!({
            "id": "ember", "entity": "ember", "position_type": "grounded",
            "bucket": "common", "weight": 100.0, "labels": ["fire"]
        })))
        .clone())
        .unwrap();
        pool.insert((*rabbit()).clone()).unwrap();

        let no_fire: Arc<dyn SpawningInfluence> = Arc::new(rule(json!({
            "name": "no_fire",
            "components": [{"type": "filter", "detail": {"labels": ["fire"]}}]
        })));
        let selector = SpawningSelector::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let mut position = grounded_at(BlockPos::new(0, 9, 0), 4);
            position.attach_influence(no_fire.clone());
            let actions = selector.select(
                &pool,
                &SpawnBucket::new("common", 90.0),
                vec![position],
                1,
                &world,
                &mut rng,
            );
            assert_eq!(actions.len(), 1);
            assert_eq!(actions[0].detail.id, "rabbit");
        }
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let FlatWorld { world, .. } = flat_world(10);
        let negative = json!({
            "name": "bad",
            "components": [{"type": "weight", "multiplier": -1.0}]
        });
        assert!(matches!(
            SpawnRule::parse(&negative, world.biomes()),
            Err(LoadError::InvalidRule { .. })
        ));
        let inverted = json!({
            "name": "bad_band",
            "components": [{"type": "location", "min_y": 10, "max_y": 2}]
        });
        assert!(SpawnRule::parse(&inverted, world.biomes()).is_err());

        let unknown_kind = json!([{
            "name": "flying",
            "components": [{"type": "location", "kinds": ["airborne"]}]
        }]);
        assert!(matches!(
            load_rules_value(&unknown_kind, "test", world.biomes()),
            Err(LoadError::UnknownPositionType(_))
        ));

        let mixed = json!([
            {"name": "bad", "components": [{"type": "weight", "multiplier": -1.0}]},
            {"name": "good", "components": []}
        ]);
        let rules = load_rules_value(&mixed, "test", world.biomes()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
    }

    #[test]
    fn test_load_rules_dir_skips_disabled() {
        let FlatWorld { world, .. } = flat_world(10);
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("a.json"),
            json!({"name": "a", "components": [{"type": "weight", "multiplier": 2.0}]}).to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("nested/b.json"),
            json!([
                {"name": "b", "enabled": false, "components": []},
                {"name": "c", "components": [{"type": "filter"}]}
            ])
            .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let rules = load_rules_dir(dir.path(), world.biomes()).unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);

        assert!(load_rules_dir(&dir.path().join("missing"), world.biomes()).unwrap().is_empty());
    }
}
