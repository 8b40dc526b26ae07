//! Error types for zone generation and content loading.

use std::path::PathBuf;

use thiserror::Error;

/// A spawn pass could not scan its region. These are recoverable: the pass
/// yields zero spawns and the next scheduled tick retries.
#[derive(Debug, Error, PartialEq)]
pub enum ZoneError {
    /// The requested region collapsed to less than one block after being
    /// clamped to the world's build height.
    #[error("zone at y={base_y} with height {height} collapses after clamping to build height")]
    InvalidHeight { base_y: i32, height: i32 },
    /// The region has no horizontal extent.
    #[error("zone has non-positive footprint {length}x{width}")]
    InvalidFootprint { length: i32, width: i32 },
    /// A chunk the region needs is not loaded.
    #[error("chunk ({x}, {z}) is not loaded")]
    ChunkNotLoaded { x: i32, z: i32 },
}

/// Errors raised while loading archetype documents or registering types.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    /// A document names a condition type nobody registered.
    #[error("unknown condition type `{0}`")]
    UnknownConditionType(String),
    /// A document names a spawn detail type nobody registered.
    #[error("unknown spawn detail type `{0}`")]
    UnknownDetailType(String),
    /// A document names a position kind with no calculator.
    #[error("unknown spawnable position type `{0}`")]
    UnknownPositionType(String),
    /// A document names a bucket missing from the configured bucket list.
    #[error("spawn detail `{id}` references unknown bucket `{bucket}`")]
    UnknownBucket { id: String, bucket: String },
    /// A registry key is already taken.
    #[error("`{0}` is already registered")]
    DuplicateKey(String),
    #[error("malformed document: {0}")]
    Malformed(String),
    /// A detail parsed but fails validation; it is excluded from the pool.
    #[error("spawn detail `{id}` is invalid: {reason}")]
    InvalidDetail { id: String, reason: String },
    /// A spawn rule parsed but fails validation; it is left out.
    #[error("spawn rule `{name}` is invalid: {reason}")]
    InvalidRule { name: String, reason: String },
}

impl LoadError {
    /// Fatal errors abort loading; the rest only exclude the offending detail.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoadError::Io { .. }
                | LoadError::UnknownConditionType(_)
                | LoadError::UnknownDetailType(_)
                | LoadError::UnknownPositionType(_)
                | LoadError::UnknownBucket { .. }
                | LoadError::DuplicateKey(_)
        )
    }
}
