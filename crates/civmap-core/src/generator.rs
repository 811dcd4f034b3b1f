//! Pipeline orchestrator: dispatches a generator mode and runs the stages
//! in their fixed order.
//!
//! Stage order (identical for every mode; Island/Fair swap the classifier
//! for island placement):
//!   1. Height synthesis and calibration
//!   2. Temperature classification
//!   3. Terrain (classifier or island placement)
//!   4. Ocean refinement, continents, lakes
//!   5. Rivers
//!   6. Resources
//!   7. Starting positions
//!   8. Validation
//!
//! A single RNG stream is threaded through the stages in this order, so a
//! fixed (seed, config, players) triple reproduces the map byte for byte.

use crate::cancel::CancelToken;
use crate::config::{GeneratorMode, MapConfig, TerrainPercentages};
use crate::continents::process_oceans_and_continents;
use crate::error::GenerationError;
use crate::height::{generate_height_map, HeightMap};
use crate::island::IslandGenerator;
use crate::map_data::{MapData, PlayerId, Tile};
use crate::relief::classify_base_terrain;
use crate::resources::place_resources;
use crate::rivers::generate_rivers;
use crate::rng::GameRng;
use crate::ruleset::{Resource, Ruleset};
use crate::start_pos::place_starting_positions;
use crate::temperature::TemperatureMap;
use crate::terrain::TerrainType;
use crate::validator::validate_map;

/// Fair mode reruns the pipeline at most this many times.
const FAIR_ATTEMPTS: u32 = 5;

/// Generate a map with the built-in ruleset.
pub fn generate(
    seed: &[u8],
    config: &MapConfig,
    players: &[PlayerId],
    cancel: Option<&CancelToken>,
) -> Result<MapData, GenerationError> {
    MapGenerator::new(Ruleset::standard()).generate(seed, config, players, cancel)
}

/// Run many independent generations in parallel; each owns its RNG, grid,
/// and scratch state, so results match the sequential ones exactly.
#[cfg(feature = "threading")]
pub fn generate_batch(
    seeds: &[Vec<u8>],
    config: &MapConfig,
    players: &[PlayerId],
) -> Vec<Result<MapData, GenerationError>> {
    use rayon::prelude::*;
    seeds
        .par_iter()
        .map(|seed| generate(seed, config, players, None))
        .collect()
}

fn check_cancelled(cancel: Option<&CancelToken>) -> Result<(), GenerationError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(GenerationError::Cancelled),
        _ => Ok(()),
    }
}

/// Fair-mode knob scaling: terrain percentages ramp from 1.0x on the first
/// attempt to 1.5x on the last, capped at 100.
fn parameter_adjustment(
    base: TerrainPercentages,
    attempt: u32,
    max_attempts: u32,
) -> TerrainPercentages {
    let factor = if max_attempts <= 1 {
        100
    } else {
        100 + 50 * (attempt - 1) / (max_attempts - 1)
    };
    let scale = |v: u32| (v * factor / 100).min(100);
    TerrainPercentages {
        river: scale(base.river),
        mountain: scale(base.mountain),
        desert: scale(base.desert),
        forest: scale(base.forest),
        swamp: scale(base.swamp),
    }
}

/// Owns the ruleset for the duration of one or more generations.
pub struct MapGenerator {
    rules: Ruleset,
}

impl MapGenerator {
    pub fn new(rules: Ruleset) -> Self {
        Self { rules }
    }

    /// The single public operation: a full map or a typed error, never a
    /// partial result.
    pub fn generate(
        &self,
        seed: &[u8],
        config: &MapConfig,
        players: &[PlayerId],
        cancel: Option<&CancelToken>,
    ) -> Result<MapData, GenerationError> {
        config.validate(players.len())?;
        let mut rng = GameRng::from_seed(seed);
        match config.generator {
            GeneratorMode::Fair => {
                let mut last = GenerationError::ValidationFailed {
                    issues: vec!["fair mode ran no attempts".into()],
                };
                for attempt in 1..=FAIR_ATTEMPTS {
                    check_cancelled(cancel)?;
                    let percentages =
                        parameter_adjustment(config.terrain_percentages, attempt, FAIR_ATTEMPTS);
                    match self.run_pipeline(seed, config, percentages, players, cancel, &mut rng)
                    {
                        Ok(map) => return Ok(map),
                        Err(
                            err @ (GenerationError::Cancelled
                            | GenerationError::InvalidConfig { .. }),
                        ) => return Err(err),
                        Err(err) => last = err,
                    }
                }
                Err(last)
            }
            _ => self.run_pipeline(
                seed,
                config,
                config.terrain_percentages,
                players,
                cancel,
                &mut rng,
            ),
        }
    }

    fn run_pipeline(
        &self,
        seed: &[u8],
        config: &MapConfig,
        percentages: TerrainPercentages,
        players: &[PlayerId],
        cancel: Option<&CancelToken>,
        rng: &mut GameRng,
    ) -> Result<MapData, GenerationError> {
        let (w, h) = (config.width, config.height);

        check_cancelled(cancel)?;
        let mut heights = generate_height_map(config, players.len(), rng);

        check_cancelled(cancel)?;
        let tmap = TemperatureMap::build(&heights, config.temperature);

        check_cancelled(cancel)?;
        let mut river_flags = vec![false; w * h];
        let mut terrain = match config.generator {
            GeneratorMode::Random | GeneratorMode::Fractal => {
                classify_base_terrain(&heights, &tmap, &self.rules, rng)
            }
            GeneratorMode::Island | GeneratorMode::Fair => {
                let mut terrain = vec![TerrainType::DeepOcean; w * h];
                let mut islands = IslandGenerator::new(
                    &mut terrain,
                    &mut heights,
                    &mut river_flags,
                    &tmap,
                    &self.rules,
                    rng,
                    percentages,
                    config.land_percent,
                );
                islands.run(players.len(), cancel)?;
                terrain
            }
        };

        check_cancelled(cancel)?;
        let ids =
            process_oceans_and_continents(&mut terrain, &heights, &tmap, config.generator, rng);

        check_cancelled(cancel)?;
        let rivers = generate_rivers(&mut terrain, &heights, &self.rules, &mut river_flags, rng);

        check_cancelled(cancel)?;
        let resources = place_resources(&terrain, &tmap, &self.rules, w, rng);

        check_cancelled(cancel)?;
        let placed = place_starting_positions(
            &terrain,
            &ids,
            &rivers.masks,
            players,
            config.start_pos_mode,
            w,
            h,
        )?;

        let map = self.assemble(
            seed,
            config,
            &heights,
            &tmap,
            &terrain,
            &ids,
            &rivers.masks,
            &resources,
            placed.positions,
        );
        let report = validate_map(&map, config, players, placed.min_spacing);
        if !report.ok {
            return Err(GenerationError::ValidationFailed {
                issues: report.errors,
            });
        }
        Ok(map)
    }

    fn assemble(
        &self,
        seed: &[u8],
        config: &MapConfig,
        heights: &HeightMap,
        tmap: &TemperatureMap,
        terrain: &[TerrainType],
        ids: &[u32],
        masks: &[u8],
        resources: &[Option<Resource>],
        starting_positions: Vec<crate::map_data::StartingPosition>,
    ) -> MapData {
        let (w, h) = (config.width, config.height);
        let mut tiles = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                tiles.push(Tile {
                    x,
                    y,
                    terrain: terrain[i],
                    elevation: heights.elevation(x, y),
                    temperature: tmap.class_at(x, y),
                    continent_id: ids[i],
                    river_mask: masks[i],
                    resource: resources[i],
                    affinities: self.rules.affinity(terrain[i]),
                });
            }
        }
        MapData {
            width: w,
            height: h,
            tiles,
            starting_positions,
            seed: seed.to_vec(),
        }
    }
}
