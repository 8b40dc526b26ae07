//! Condition types keyed by name.

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    AreaFields, BaseCondition, CompositeCondition, FishingFields, FloorFields, FluidFields,
    SpawningCondition,
};
use crate::error::LoadError;

/// Builds a condition variant from a JSON object.
pub type ConditionParser = fn(&Value) -> Result<SpawningCondition, serde_json::Error>;

/// Field groups are read from the same flat object; each ignores the keys
/// the others own.
fn group<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}

fn parse_basic(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Basic(group::<BaseCondition>(value)?))
}

fn parse_area(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Area {
        base: group(value)?,
        area: group::<AreaFields>(value)?,
    })
}

fn parse_grounded(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Grounded {
        base: group(value)?,
        area: group(value)?,
        floor: group::<FloorFields>(value)?,
    })
}

fn parse_seafloor(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Seafloor {
        base: group(value)?,
        area: group(value)?,
        floor: group(value)?,
    })
}

fn parse_lavafloor(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Lavafloor {
        base: group(value)?,
        area: group(value)?,
        floor: group(value)?,
    })
}

fn parse_surface(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Surface {
        base: group(value)?,
        area: group(value)?,
        fluid: group::<FluidFields>(value)?,
    })
}

fn parse_submerged(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Submerged {
        base: group(value)?,
        area: group(value)?,
        fluid: group(value)?,
    })
}

fn parse_fishing(value: &Value) -> Result<SpawningCondition, serde_json::Error> {
    Ok(SpawningCondition::Fishing {
        base: group(value)?,
        fishing: group::<FishingFields>(value)?,
    })
}

/// Name → parser lookup, populated once at startup.
pub struct ConditionRegistry {
    parsers: FxHashMap<String, ConditionParser>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self {
            parsers: FxHashMap::default(),
        }
    }

    /// Registry with a parser for every built-in kind plus `basic` and `area`.
    pub fn with_defaults() -> Self {
        let mut parsers: FxHashMap<String, ConditionParser> = FxHashMap::default();
        let defaults: [(&str, ConditionParser); 8] = [
            ("basic", parse_basic),
            ("area", parse_area),
            ("grounded", parse_grounded),
            ("seafloor", parse_seafloor),
            ("lavafloor", parse_lavafloor),
            ("surface", parse_surface),
            ("submerged", parse_submerged),
            ("fishing", parse_fishing),
        ];
        for (name, parser) in defaults {
            parsers.insert(name.to_string(), parser);
        }
        Self { parsers }
    }

    pub fn register(&mut self, name: &str, parser: ConditionParser) -> Result<(), LoadError> {
        if self.parsers.contains_key(name) {
            return Err(LoadError::DuplicateKey(name.to_string()));
        }
        self.parsers.insert(name.to_string(), parser);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    /// Parses one condition object. The object's `type` field picks the
    /// parser; without one, `default_type` (normally the owning detail's
    /// position type) is used.
    ///
    /// # Errors
    ///
    /// [`LoadError::UnknownConditionType`] for an unregistered type,
    /// [`LoadError::Json`] for malformed fields, [`LoadError::Malformed`] for
    /// null list entries or bad range strings.
    pub fn parse(&self, value: &Value, default_type: &str) -> Result<SpawningCondition, LoadError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(default_type);
        let parser = self
            .parsers
            .get(type_name)
            .ok_or_else(|| LoadError::UnknownConditionType(type_name.to_string()))?;
        let mut condition = parser(value).map_err(|source| LoadError::Json {
            context: format!("`{type_name}` condition"),
            source,
        })?;
        condition
            .prepare()
            .map_err(|e| LoadError::Malformed(e.to_string()))?;
        Ok(condition)
    }

    /// Parses a condition array.
    pub fn parse_list(
        &self,
        values: &[Value],
        default_type: &str,
    ) -> Result<Vec<SpawningCondition>, LoadError> {
        values.iter().map(|v| self.parse(v, default_type)).collect()
    }

    /// Parses a composite tree: `{"all": [...]}`, `{"any": [...]}`,
    /// `{"not": {...}}`, `{"conditions": [...], "anticonditions": [...]}`,
    /// or a plain condition object as a leaf.
    pub fn parse_composite(
        &self,
        value: &Value,
        default_type: &str,
    ) -> Result<CompositeCondition, LoadError> {
        let children = |key: &str| -> Result<Option<Vec<CompositeCondition>>, LoadError> {
            match value.get(key) {
                None => Ok(None),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| self.parse_composite(item, default_type))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some),
                Some(_) => Err(LoadError::Malformed(format!("`{key}` must be an array"))),
            }
        };

        if let Some(all) = children("all")? {
            return Ok(CompositeCondition::All(all));
        }
        if let Some(any) = children("any")? {
            return Ok(CompositeCondition::Any(any));
        }
        if let Some(inner) = value.get("not") {
            let inner = self.parse_composite(inner, default_type)?;
            return Ok(CompositeCondition::Not(Box::new(inner)));
        }
        let conditions = children("conditions")?;
        let anticonditions = children("anticonditions")?;
        if conditions.is_some() || anticonditions.is_some() {
            let mut all = conditions.unwrap_or_default();
            if let Some(anti) = anticonditions {
                all.push(CompositeCondition::Not(Box::new(CompositeCondition::Any(anti))));
            }
            return Ok(CompositeCondition::All(all));
        }
        let leaf = self.parse(value, default_type)?;
        Ok(CompositeCondition::Condition(Box::new(leaf)))
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
