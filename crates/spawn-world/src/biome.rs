//! Biome registry. Biomes are referenced by name or by `#tag` in spawn
//! conditions; the registry resolves both.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::registry::RegistryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiomeId(pub u16);

/// A biome and the tags it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeDef {
    pub name: String,
    pub tags: Vec<String>,
}

impl BiomeDef {
    pub fn new(name: &str, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Returns `true` if `pattern` is this biome's name or a `#tag` it carries.
    pub fn matches(&self, pattern: &str) -> bool {
        match pattern.strip_prefix('#') {
            Some(tag) => self.tags.iter().any(|t| t == tag),
            None => self.name == pattern,
        }
    }
}

/// Dense biome table with reverse name lookup. Unlike blocks there is no
/// reserved ID 0; the first registered biome is the world default.
#[derive(Debug, Clone, Default)]
pub struct BiomeRegistry {
    biomes: Vec<BiomeDef>,
    name_to_id: HashMap<String, BiomeId>,
}

impl BiomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a biome and returns its ID.
    pub fn register(&mut self, def: BiomeDef) -> Result<BiomeId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.biomes.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }
        let id = BiomeId(self.biomes.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.biomes.push(def);
        Ok(id)
    }

    pub fn get(&self, id: BiomeId) -> Option<&BiomeDef> {
        self.biomes.get(id.0 as usize)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<BiomeId> {
        self.name_to_id.get(name).copied()
    }

    /// Iterates over every registered biome with its ID.
    pub fn iter(&self) -> impl Iterator<Item = (BiomeId, &BiomeDef)> {
        self.biomes
            .iter()
            .enumerate()
            .map(|(i, def)| (BiomeId(i as u16), def))
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = BiomeRegistry::new();
        let plains = registry.register(BiomeDef::new("plains", &["overworld"])).unwrap();
        let ocean = registry
            .register(BiomeDef::new("ocean", &["overworld", "is_ocean"]))
            .unwrap();
        assert_eq!(plains, BiomeId(0));
        assert_eq!(registry.lookup_by_name("ocean"), Some(ocean));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_tag_matching() {
        let ocean = BiomeDef::new("ocean", &["is_ocean"]);
        assert!(ocean.matches("#is_ocean"));
        assert!(ocean.matches("ocean"));
        assert!(!ocean.matches("#is_forest"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = BiomeRegistry::new();
        registry.register(BiomeDef::new("plains", &[])).unwrap();
        assert!(registry.register(BiomeDef::new("plains", &[])).is_err());
    }
}
