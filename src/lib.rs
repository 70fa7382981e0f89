pub mod biome;
pub mod config;
pub mod error;
pub mod fertile;
pub mod generator;
pub mod grid;
pub mod heightmap;
pub mod hillshade;
pub mod hydrology;
pub mod noise;
pub mod png;
pub mod report;
pub mod resources;
pub mod spawn;
pub mod vegetation;

pub use biome::Tile;
pub use config::{GeneratorParams, NoiseBackend, ShadingConfig, TerrainConfig};
pub use error::{Error, Result};
pub use generator::{AuxFields, GenerationContext, World, generate_terrain, generate_terrain_with_report};
pub use grid::Dims;
pub use hillshade::make_hillshade;
pub use report::GenerationReport;
