//! Deterministic procedural world generator for a Civ-style tile game.
//!
//! From a seed, a configuration, and an ordered player list, `generate`
//! produces a finite rectangular tile grid with elevations, climate
//! classes, terrain, hydrology, continent labels, resources, and balanced
//! starting positions. The same inputs produce the same bytes on every
//! platform: all randomness flows through one integer LCG stream and all
//! intermediate arithmetic is fixed-precision.
//!
//! The crate is pure computation. It opens no files or sockets, reads no
//! clock, and sources no OS entropy; serialization of the resulting
//! [`MapData`] is the caller's business.

pub mod cancel;
pub mod config;
pub mod continents;
pub mod error;
pub mod generator;
pub mod height;
pub mod intmap;
pub mod island;
pub mod map_data;
pub mod relief;
pub mod resources;
pub mod rivers;
pub mod rng;
pub mod ruleset;
pub mod start_pos;
pub mod temperature;
pub mod terrain;
pub mod validator;

pub use cancel::CancelToken;
pub use config::{GeneratorMode, MapConfig, StartPosMode, TerrainPercentages};
pub use error::GenerationError;
pub use generator::{generate, MapGenerator};
#[cfg(feature = "threading")]
pub use generator::generate_batch;
pub use map_data::{MapData, PlayerId, StartingPosition, Tile};
pub use ruleset::{Resource, Ruleset, TerrainAffinity};
pub use temperature::TemperatureClass;
pub use terrain::TerrainType;
pub use validator::{validate_map, ValidationReport};
