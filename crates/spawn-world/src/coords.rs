//! Integer block and chunk coordinates.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Width of a chunk column along X and Z, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// Absolute position of a block in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the position offset by `(dx, dy, dz)`.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    pub fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The chunk column containing this block.
    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Corner of the block as a floating point vector.
    pub fn as_dvec3(self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// Rounds a floating point position down to the containing block.
    pub fn from_dvec3(v: DVec3) -> Self {
        Self::new(v.x.floor() as i32, v.y.floor() as i32, v.z.floor() as i32)
    }

    /// Squared euclidean distance between block corners.
    pub fn distance_sq(self, other: BlockPos) -> f64 {
        self.as_dvec3().distance_squared(other.as_dvec3())
    }
}

/// Identifies a chunk column by its chunk-grid X and Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The lowest-X, lowest-Z block column of this chunk.
    pub fn min_block_x(self) -> i32 {
        self.x * CHUNK_WIDTH
    }

    pub fn min_block_z(self) -> i32 {
        self.z * CHUNK_WIDTH
    }
}
