//! Reading detail documents from JSON.
//!
//! A file holds a single detail object, an array of them, or a wrapper
//! `{"enabled": bool, "spawns": [...]}`. Every detail names its `type`
//! (default `entity`), `position_type`, `bucket`, a `weight` and/or a
//! `percentage`, and optional `conditions`, `anticonditions`,
//! `composite_condition`, `weight_multipliers` and `labels`. The remaining
//! fields belong to the detail type's parser.
//!
//! Unknown type names and unknown buckets abort loading. A detail that is
//! malformed or fails validation is logged and left out.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use spawn_world::BiomeRegistry;
use tracing::{debug, error, info, warn};

use super::{DetailKind, EntitySpawn, HerdSpawn, SpawnDetail, SpawnPool, WeightMultiplier};
use crate::bucket::SpawnBucket;
use crate::condition::ConditionRegistry;
use crate::error::LoadError;
use crate::position::PositionKind;

// ---------------------------------------------------------------------------
// Detail types
// ---------------------------------------------------------------------------

/// Builds the type-specific part of a detail from its document.
pub type DetailParser = fn(&Value) -> Result<DetailKind, serde_json::Error>;

fn parse_entity(value: &Value) -> Result<DetailKind, serde_json::Error> {
    Ok(DetailKind::Entity(EntitySpawn::deserialize(value)?))
}

fn parse_herd(value: &Value) -> Result<DetailKind, serde_json::Error> {
    Ok(DetailKind::Herd(HerdSpawn::deserialize(value)?))
}

/// Detail type name → parser.
pub struct DetailTypeRegistry {
    parsers: FxHashMap<String, DetailParser>,
}

impl DetailTypeRegistry {
    pub fn new() -> Self {
        Self {
            parsers: FxHashMap::default(),
        }
    }

    /// `entity` and `herd`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.parsers.insert("entity".to_string(), parse_entity);
        registry.parsers.insert("herd".to_string(), parse_herd);
        registry
    }

    pub fn register(&mut self, name: &str, parser: DetailParser) -> Result<(), LoadError> {
        if self.parsers.contains_key(name) {
            return Err(LoadError::DuplicateKey(name.to_string()));
        }
        self.parsers.insert(name.to_string(), parser);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<DetailParser> {
        self.parsers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }
}

impl Default for DetailTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn default_detail_type() -> String {
    "entity".to_string()
}

/// Fields every detail type shares.
#[derive(Deserialize)]
struct DetailHeader {
    id: String,
    #[serde(rename = "type", default = "default_detail_type")]
    detail_type: String,
    #[serde(alias = "context")]
    position_type: String,
    bucket: String,
    #[serde(default)]
    weight: Option<f32>,
    #[serde(default)]
    percentage: Option<f32>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    conditions: Vec<Value>,
    #[serde(default)]
    anticonditions: Vec<Value>,
    #[serde(default)]
    composite_condition: Option<Value>,
    #[serde(default)]
    weight_multipliers: Vec<MultiplierDocument>,
}

#[derive(Deserialize)]
struct MultiplierDocument {
    multiplier: f32,
    #[serde(default)]
    conditions: Vec<Value>,
    #[serde(default)]
    anticonditions: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Parses detail documents against the registries and bucket list in use.
pub struct DetailLoader<'a> {
    conditions: &'a ConditionRegistry,
    types: &'a DetailTypeRegistry,
    buckets: &'a [SpawnBucket],
    biomes: Option<&'a BiomeRegistry>,
}

impl<'a> DetailLoader<'a> {
    pub fn new(
        conditions: &'a ConditionRegistry,
        types: &'a DetailTypeRegistry,
        buckets: &'a [SpawnBucket],
    ) -> Self {
        Self {
            conditions,
            types,
            buckets,
            biomes: None,
        }
    }

    /// Resolve biome patterns against `biomes` as details are loaded.
    pub fn with_biomes(mut self, biomes: &'a BiomeRegistry) -> Self {
        self.biomes = Some(biomes);
        self
    }

    /// Parses and validates one detail object.
    pub fn parse_detail(&self, value: &Value) -> Result<SpawnDetail, LoadError> {
        let context = || {
            let id = value.get("id").and_then(Value::as_str).unwrap_or("<unnamed>");
            format!("spawn detail `{id}`")
        };
        let header = DetailHeader::deserialize(value).map_err(|source| LoadError::Json {
            context: context(),
            source,
        })?;

        let position_type = PositionKind::from_name(&header.position_type)
            .ok_or_else(|| LoadError::UnknownPositionType(header.position_type.clone()))?;
        if !self.buckets.iter().any(|b| b.name == header.bucket) {
            return Err(LoadError::UnknownBucket {
                id: header.id,
                bucket: header.bucket,
            });
        }
        let parser = self
            .types
            .get(&header.detail_type)
            .ok_or_else(|| LoadError::UnknownDetailType(header.detail_type.clone()))?;
        let kind = parser(value).map_err(|source| LoadError::Json {
            context: context(),
            source,
        })?;

        let kind_name = position_type.name();
        let conditions = self.conditions.parse_list(&header.conditions, kind_name)?;
        let anticonditions = self.conditions.parse_list(&header.anticonditions, kind_name)?;
        let composite = header
            .composite_condition
            .as_ref()
            .map(|v| self.conditions.parse_composite(v, kind_name))
            .transpose()?;
        let weight_multipliers = header
            .weight_multipliers
            .iter()
            .map(|m| {
                Ok(WeightMultiplier {
                    multiplier: m.multiplier,
                    conditions: self.conditions.parse_list(&m.conditions, kind_name)?,
                    anticonditions: self.conditions.parse_list(&m.anticonditions, kind_name)?,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let percentage = header.percentage.filter(|p| *p > 0.0);
        let weight = match (header.weight, percentage) {
            (Some(weight), _) => weight,
            (None, Some(_)) => 0.0,
            (None, None) => {
                return Err(LoadError::InvalidDetail {
                    id: header.id,
                    reason: "needs a weight or a percentage".to_string(),
                });
            }
        };

        let mut detail = SpawnDetail {
            id: header.id,
            detail_type: header.detail_type,
            position_type,
            bucket: header.bucket,
            conditions,
            anticonditions,
            composite,
            weight_multipliers,
            weight,
            percentage,
            labels: header.labels,
            kind,
        };
        detail.validate()?;
        if let Some(biomes) = self.biomes {
            detail.resolve_biomes(biomes);
        }
        Ok(detail)
    }

    /// Adds every detail in a parsed document to `pool`. Returns how many
    /// were added.
    pub fn load_value(
        &self,
        value: &Value,
        source: &str,
        pool: &mut SpawnPool,
    ) -> Result<usize, LoadError> {
        let details: &[Value] = match value {
            Value::Array(items) => items,
            Value::Object(object) if object.contains_key("spawns") => {
                if !object.get("enabled").and_then(Value::as_bool).unwrap_or(true) {
                    debug!("Skipping disabled spawn file {source}");
                    return Ok(0);
                }
                match object.get("spawns") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        error!("{source}: `spawns` must be an array");
                        return Ok(0);
                    }
                }
            }
            Value::Object(_) => std::slice::from_ref(value),
            _ => {
                error!("{source}: expected a detail object or array");
                return Ok(0);
            }
        };

        let mut added = 0;
        for document in details {
            match self.parse_detail(document) {
                Ok(detail) => {
                    let id = detail.id.clone();
                    if pool.insert(detail)? {
                        added += 1;
                    } else {
                        warn!("{source}: duplicate spawn detail `{id}` ignored");
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("{source}: {e}"),
            }
        }
        Ok(added)
    }

    /// Loads one JSON file into `pool`.
    pub fn load_file(&self, path: &Path, pool: &mut SpawnPool) -> Result<usize, LoadError> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = path.display().to_string();
        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => self.load_value(&value, &source, pool),
            Err(e) => {
                error!("{source}: invalid JSON: {e}");
                Ok(0)
            }
        }
    }

    /// Loads every `.json` file under `dir`, recursively, in path order.
    /// A missing directory loads nothing.
    pub fn load_dir(&self, dir: &Path, pool: &mut SpawnPool) -> Result<usize, LoadError> {
        if !dir.is_dir() {
            warn!("Spawn detail directory {} does not exist", dir.display());
            return Ok(0);
        }
        let mut files = Vec::new();
        collect_json_files(dir, &mut files)?;
        files.sort();

        let mut added = 0;
        for file in &files {
            added += self.load_file(file, pool)?;
        }
        info!(
            "Loaded {added} spawn details from {} files in {}",
            files.len(),
            dir.display()
        );
        Ok(added)
    }
}

/// Every `.json` file under `dir`, recursively, unsorted.
pub(crate) fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let io_error = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
