//! World model consumed by the spawner: block and biome registries, block
//! coordinates, the read-only [`WorldQuery`] interface, and [`GridWorld`], an
//! in-memory chunk-keyed world used by tests, benches and the demo.

pub mod biome;
pub mod coords;
pub mod grid_world;
pub mod query;
pub mod registry;

pub use biome::{BiomeDef, BiomeId, BiomeRegistry};
pub use coords::{BlockPos, CHUNK_WIDTH, ChunkPos};
pub use grid_world::GridWorld;
pub use query::{BaitEffect, EntityId, LivingEntity, PointOfInterest, WorldMut, WorldQuery};
pub use registry::{BlockDef, BlockId, BlockRegistry, FluidKind, RegistryError};
