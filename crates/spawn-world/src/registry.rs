//! Block registry: maps compact [`BlockId`] values to [`BlockDef`] metadata.
//!
//! The registry is built once during startup and treated as read-only after.
//! Air is always ID 0 so that freshly loaded chunk columns are empty space.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored in every world cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The air block, always registered first.
    pub const AIR: BlockId = BlockId(0);
}

/// The fluid a block holds, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluidKind {
    Water,
    Lava,
}

/// Full descriptor for a block type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    /// Namespaced name (e.g. "stone", "water").
    pub name: String,
    /// Whether entities can stand on this block.
    pub solid: bool,
    /// Fluid contained in this block.
    pub fluid: Option<FluidKind>,
    /// Whether the fluid is a source block rather than flowing.
    pub fluid_source: bool,
    /// Sky remains visible through this block (air, glass, leaves).
    pub sees_sky: bool,
    /// Block light emission (0..=15).
    pub light_emission: u8,
    /// Tags this block belongs to, matched with a `#` prefix.
    pub tags: Vec<String>,
}

impl BlockDef {
    /// A solid opaque block with no tags.
    pub fn solid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            solid: true,
            fluid: None,
            fluid_source: false,
            sees_sky: false,
            light_emission: 0,
            tags: Vec::new(),
        }
    }

    /// A fluid source block.
    pub fn fluid(name: &str, kind: FluidKind) -> Self {
        Self {
            name: name.to_string(),
            solid: false,
            fluid: Some(kind),
            fluid_source: true,
            sees_sky: false,
            light_emission: if kind == FluidKind::Lava { 15 } else { 0 },
            tags: Vec::new(),
        }
    }

    /// Adds a tag, builder style.
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Neither solid nor fluid: somewhere an entity can stand inside.
    pub fn is_air_like(&self) -> bool {
        !self.solid && self.fluid.is_none()
    }

    /// Returns `true` if `pattern` names this block, or is `#tag` and the
    /// block carries that tag.
    pub fn matches(&self, pattern: &str) -> bool {
        match pattern.strip_prefix('#') {
            Some(tag) => self.tags.iter().any(|t| t == tag),
            None => self.name == pattern,
        }
    }
}

/// Errors raised while building registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An entry with the same name has already been registered.
    #[error("duplicate registry name: {0}")]
    DuplicateName(String),
    /// All available ID slots have been consumed.
    #[error("registry is full (max 65536 entries)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] → [`BlockDef`] with O(1) lookup by index and by name.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    /// Dense array where `index == BlockId.0`.
    blocks: Vec<BlockDef>,
    name_to_id: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Creates a new registry with air pre-registered as ID 0.
    pub fn new() -> Self {
        let air = BlockDef {
            name: "air".to_string(),
            solid: false,
            fluid: None,
            fluid_source: false,
            sees_sky: true,
            light_emission: 0,
            tags: Vec::new(),
        };

        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), BlockId::AIR);

        Self {
            blocks: vec![air],
            name_to_id,
        }
    }

    /// Registers a block and returns its ID. IDs are sequential from 1.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken, or
    /// [`RegistryError::RegistryFull`] when all slots are consumed.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        if self.blocks.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.blocks.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.blocks.push(def);
        Ok(id)
    }

    /// Returns the definition for `id`, falling back to air for unknown IDs.
    pub fn get(&self, id: BlockId) -> &BlockDef {
        self.blocks.get(id.0 as usize).unwrap_or(&self.blocks[0])
    }

    /// Returns the ID for a named block, or `None` if not found.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of registered blocks (including air).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    pub fn is_air(&self, id: BlockId) -> bool {
        id == BlockId::AIR
    }

    pub fn is_solid(&self, id: BlockId) -> bool {
        self.get(id).solid
    }

    pub fn fluid(&self, id: BlockId) -> Option<FluidKind> {
        self.get(id).fluid
    }

    /// Returns `true` if `pattern` (a name or `#tag`) matches the block.
    pub fn matches(&self, id: BlockId, pattern: &str) -> bool {
        self.get(id).matches(pattern)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
