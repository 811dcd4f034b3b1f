//! Base terrain classification for the height-driven modes (Random and
//! Fractal): relief bands from the calibrated thresholds, then biome
//! selection from temperature class and a smoothed wetness field.
//!
//! Water cells get a generic `Ocean` placeholder here; the continent stage
//! refines subtypes from depth afterwards.

use crate::height::{colatitude, HeightMap, ELEVATION_MAX};
use crate::intmap::IntMap;
use crate::rng::GameRng;
use crate::ruleset::{MapProperty, Ruleset};
use crate::temperature::{TemperatureClass, TemperatureMap};
use crate::terrain::TerrainType;

/// Wetness above this reads as wet; below `DRY_LEVEL` as dry.
const WET_LEVEL: i32 = 60;
const SWAMP_LEVEL: i32 = 75;
const DRY_LEVEL: i32 = 30;

/// Wetness field: random jitter shaped by height deviation (low land holds
/// water) and colatitude (equatorial air carries more of it), smoothed twice
/// and equalized to [0, 100].
pub fn build_wetness_map(heights: &HeightMap, rng: &mut GameRng) -> IntMap {
    let (w, h) = (heights.map.width, heights.map.height);
    let shore = heights.shore_level;
    let mut wet = IntMap::new(w, h, 0);
    for y in 0..h {
        let colat = colatitude(y, h);
        for x in 0..w {
            let above_shore = (heights.elevation(x, y) - shore).max(0);
            let dryness = above_shore * 100 / (ELEVATION_MAX - shore).max(1);
            let raw = 50 + rng.range_i32(-30, 31) + (colat - 500) / 10 - dryness / 2;
            wet.set(x, y, raw);
        }
    }
    wet.smooth(false);
    wet.smooth(false);
    wet.adjust(0, 100);
    wet
}

/// Classify every tile into a base terrain.
pub fn classify_base_terrain(
    heights: &HeightMap,
    tmap: &TemperatureMap,
    rules: &Ruleset,
    rng: &mut GameRng,
) -> Vec<TerrainType> {
    let (w, h) = (heights.map.width, heights.map.height);
    let wetness = build_wetness_map(heights, rng);
    // Upper 15% of the shore-to-mountain range reads as foothills.
    let hill_level = heights.shore_level
        + (heights.mountain_level - heights.shore_level) * 85 / 100;

    let mut terrain = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let elev = heights.elevation(x, y);
            if elev <= heights.shore_level {
                terrain.push(TerrainType::Ocean);
                continue;
            }
            if elev >= heights.mountain_level {
                terrain.push(TerrainType::Mountains);
                continue;
            }
            if elev >= hill_level {
                terrain.push(TerrainType::Hills);
                continue;
            }
            let wet = wetness.get(x, y);
            let class = tmap.class_at(x, y);
            terrain.push(pick_biome(rules, rng, class, wet));
        }
    }
    terrain
}

/// Biome from (temperature class, wetness), resolved through the ruleset's
/// affinity weights.
fn pick_biome(
    rules: &Ruleset,
    rng: &mut GameRng,
    class: TemperatureClass,
    wet: i32,
) -> TerrainType {
    use MapProperty::*;
    match class {
        TemperatureClass::Frozen => rules.pick_terrain(rng, Frozen, None, Some(Foliage)),
        TemperatureClass::Cold => rules.pick_terrain(rng, Cold, None, Some(Mountainous)),
        TemperatureClass::Tropical => {
            if wet >= WET_LEVEL {
                rules.pick_terrain(rng, Foliage, Some(Tropical), Some(Dry))
            } else if wet < DRY_LEVEL {
                rules.pick_terrain(rng, Dry, Some(Tropical), Some(Cold))
            } else {
                rules.pick_terrain(rng, Green, Some(Tropical), Some(Mountainous))
            }
        }
        TemperatureClass::Temperate => {
            if wet >= SWAMP_LEVEL {
                rules.pick_terrain(rng, Wet, Some(Temperate), Some(Tropical))
            } else if wet >= WET_LEVEL {
                rules.pick_terrain(rng, Foliage, Some(Temperate), Some(Tropical))
            } else if wet < DRY_LEVEL {
                rules.pick_terrain(rng, Dry, Some(Temperate), Some(Tropical))
            } else {
                rules.pick_terrain(rng, Green, Some(Temperate), Some(Mountainous))
            }
        }
    }
}
