//! Final invariant checks over a finished map. The generator refuses to
//! publish a map whose report is not ok; tests and the Fair retry loop
//! lean on the same checks.

use serde::{Deserialize, Serialize};

use crate::config::{MapConfig, StartPosMode};
use crate::intmap::{flood_fill, CARDINAL_OFFSETS};
use crate::map_data::{MapData, PlayerId};
use crate::terrain::TerrainType;

/// Tolerance on the realized land share, in percentage points.
const LAND_TOLERANCE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationDetails {
    pub land_percent: usize,
    pub starting_positions: usize,
    pub largest_continent_size: usize,
    pub river_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub details: ValidationDetails,
}

/// Check every output invariant. `min_spacing` is the spacing the placer
/// actually enforced (after any fallback halving).
pub fn validate_map(
    map: &MapData,
    config: &MapConfig,
    players: &[PlayerId],
    min_spacing: usize,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let (w, h) = (map.width, map.height);

    // Grid shape and coordinates.
    if map.tiles.len() != w * h {
        errors.push(format!(
            "tile count {} does not match {w}x{h}",
            map.tiles.len()
        ));
    }
    for (i, tile) in map.tiles.iter().enumerate() {
        if tile.x != i % w || tile.y != i / w {
            errors.push(format!(
                "tile {i} claims ({}, {}), expected ({}, {})",
                tile.x,
                tile.y,
                i % w,
                i / w
            ));
            break;
        }
    }

    // Elevation domain.
    for tile in &map.tiles {
        if !(0..=255).contains(&tile.elevation) {
            errors.push(format!(
                "elevation {} out of range at ({}, {})",
                tile.elevation, tile.x, tile.y
            ));
            break;
        }
    }

    // Continent ids: 0 exactly on ocean subtypes; lakes and land positive.
    for tile in &map.tiles {
        let ocean = tile.terrain.is_ocean();
        if ocean && tile.continent_id != 0 {
            errors.push(format!(
                "ocean tile ({}, {}) has continent id {}",
                tile.x, tile.y, tile.continent_id
            ));
            break;
        }
        if !ocean && tile.continent_id == 0 {
            errors.push(format!(
                "{:?} tile ({}, {}) has continent id 0",
                tile.terrain, tile.x, tile.y
            ));
            break;
        }
    }

    // One id per land component; ids contiguous from 1.
    let land_ids = check_components(map, &mut errors);

    // River masks.
    check_rivers(map, &mut errors);

    // Land share.
    let land_percent = map.land_percent();
    if land_percent.abs_diff(config.land_percent as usize) > LAND_TOLERANCE {
        errors.push(format!(
            "realized land {land_percent}% misses target {}% by more than {LAND_TOLERANCE}",
            config.land_percent
        ));
    }

    // Starting positions.
    check_starts(map, config, players, min_spacing, &mut errors, &mut warnings);

    let details = ValidationDetails {
        land_percent,
        starting_positions: map.starting_positions.len(),
        largest_continent_size: land_ids,
        river_count: map
            .tiles
            .iter()
            .filter(|t| t.river_mask > 0)
            .count(),
    };
    ValidationReport {
        ok: errors.is_empty(),
        errors,
        warnings,
        details,
    }
}

/// Flood-fill every land component, confirming a single positive id per
/// component and a contiguous id range. Returns the largest component size.
fn check_components(map: &MapData, errors: &mut Vec<String>) -> usize {
    let (w, h) = (map.width, map.height);
    let mut visited = vec![false; w * h];
    let mut seen_ids = Vec::new();
    let mut largest = 0usize;
    for i in 0..map.tiles.len() {
        let comp = flood_fill(w, h, i, &mut visited, |j| map.tiles[j].terrain.is_land());
        if comp.is_empty() {
            continue;
        }
        largest = largest.max(comp.len());
        let id = map.tiles[comp[0]].continent_id;
        if comp.iter().any(|&j| map.tiles[j].continent_id != id) {
            errors.push(format!("land component containing tile {i} has mixed ids"));
        }
        seen_ids.push(id);
    }
    seen_ids.sort_unstable();
    if seen_ids.windows(2).any(|pair| pair[0] == pair[1]) {
        errors.push("two separate land components share a continent id".into());
    }
    if let Some(&max_id) = seen_ids.last() {
        if seen_ids.len() != max_id as usize
            || seen_ids.first() != Some(&1)
        {
            errors.push(format!(
                "continent ids {seen_ids:?} are not the contiguous range 1..={max_id}"
            ));
        }
    }
    largest
}

fn check_rivers(map: &MapData, errors: &mut Vec<String>) {
    let (w, h) = (map.width, map.height);
    for tile in &map.tiles {
        if tile.river_mask == 0 {
            continue;
        }
        if tile.terrain.is_ocean() && tile.terrain != TerrainType::Coast {
            errors.push(format!(
                "river mask on open water at ({}, {})",
                tile.x, tile.y
            ));
            break;
        }
        if tile.terrain == TerrainType::Lake {
            errors.push(format!("river mask on lake at ({}, {})", tile.x, tile.y));
            break;
        }
        for (bit, (dx, dy)) in CARDINAL_OFFSETS.iter().enumerate() {
            if tile.river_mask & (1 << bit) == 0 {
                continue;
            }
            let (nx, ny) = (tile.x as i32 + dx, tile.y as i32 + dy);
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                errors.push(format!(
                    "river mask bit {bit} points off-map at ({}, {})",
                    tile.x, tile.y
                ));
                continue;
            }
            let neighbor = map.tile(nx as usize, ny as usize);
            if neighbor.river_mask == 0 && !neighbor.terrain.is_ocean() {
                errors.push(format!(
                    "river mask bit {bit} at ({}, {}) points at dry {:?}",
                    tile.x, tile.y, neighbor.terrain
                ));
            }
        }
    }
}

fn check_starts(
    map: &MapData,
    config: &MapConfig,
    players: &[PlayerId],
    min_spacing: usize,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let starts = &map.starting_positions;
    if starts.len() != players.len() {
        errors.push(format!(
            "{} starting positions for {} players",
            starts.len(),
            players.len()
        ));
        return;
    }
    for pos in starts {
        let tile = map.tile(pos.x, pos.y);
        if tile.terrain.is_water() || tile.terrain == TerrainType::Mountains {
            errors.push(format!(
                "spawn for {} on {:?} at ({}, {})",
                pos.player_id, tile.terrain, pos.x, pos.y
            ));
        }
    }
    // Same-continent spacing.
    for a in 0..starts.len() {
        for b in a + 1..starts.len() {
            let (pa, pb) = (&starts[a], &starts[b]);
            let ca = map.tile(pa.x, pa.y).continent_id;
            let cb = map.tile(pb.x, pb.y).continent_id;
            if ca != cb {
                continue;
            }
            let d = pa.x.abs_diff(pb.x).max(pa.y.abs_diff(pb.y));
            if d < min_spacing {
                errors.push(format!(
                    "spawns {} and {} are {d} apart, spacing {min_spacing}",
                    pa.player_id, pb.player_id
                ));
            }
        }
    }
    // Mode-specific continent distribution.
    let mut per_continent = std::collections::BTreeMap::new();
    for pos in starts {
        *per_continent
            .entry(map.tile(pos.x, pos.y).continent_id)
            .or_insert(0usize) += 1;
    }
    let p = players.len();
    match config.start_pos_mode {
        StartPosMode::SingleContinent => {
            if per_continent.len() > 1 {
                errors.push(format!(
                    "single-continent mode spread spawns over {} continents",
                    per_continent.len()
                ));
            }
        }
        StartPosMode::TwoOnThree => {
            let cap = (2 * p).div_ceil(3);
            for (continent, count) in &per_continent {
                if *count > cap {
                    errors.push(format!(
                        "continent {continent} holds {count} spawns, cap {cap}"
                    ));
                }
            }
        }
        StartPosMode::Variable => {
            // The placer relaxes the ceil(P/2) cap on continent-starved
            // worlds, so exceeding it is suspicious but not fatal.
            let cap = p.div_ceil(2);
            for (continent, count) in &per_continent {
                if *count > cap {
                    warnings.push(format!(
                        "continent {continent} holds {count} spawns, soft cap {cap}"
                    ));
                }
            }
        }
        StartPosMode::AllContinents => {
            if per_continent.len() < 2 && p >= 2 {
                warnings.push(
                    "all-continents mode landed every spawn on one continent".into(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::{StartingPosition, Tile};
    use crate::ruleset::TerrainAffinity;
    use crate::temperature::TemperatureClass;

    /// 8x8 world: left half one continent, right half ocean.
    fn hand_built_map() -> MapData {
        let (w, h) = (8usize, 8usize);
        let mut tiles = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let land = x < 4;
                tiles.push(Tile {
                    x,
                    y,
                    terrain: if land {
                        TerrainType::Grassland
                    } else if x == 4 {
                        TerrainType::Coast
                    } else {
                        TerrainType::Ocean
                    },
                    elevation: if land { 200 } else { 50 },
                    temperature: TemperatureClass::Temperate,
                    continent_id: u32::from(land),
                    river_mask: 0,
                    resource: None,
                    affinities: TerrainAffinity::default(),
                });
            }
        }
        MapData {
            width: w,
            height: h,
            tiles,
            starting_positions: vec![
                StartingPosition { x: 0, y: 0, player_id: "a".into() },
                StartingPosition { x: 3, y: 7, player_id: "b".into() },
            ],
            seed: b"hand".to_vec(),
        }
    }

    fn base_config() -> MapConfig {
        MapConfig {
            width: 8,
            height: 8,
            land_percent: 50,
            start_pos_mode: StartPosMode::SingleContinent,
            ..Default::default()
        }
    }

    fn player_list() -> Vec<PlayerId> {
        vec!["a".into(), "b".into()]
    }

    #[test]
    fn hand_built_map_passes() {
        let report = validate_map(&hand_built_map(), &base_config(), &player_list(), 3);
        assert!(report.ok, "errors: {:?}", report.errors);
        assert_eq!(report.details.land_percent, 50);
        assert_eq!(report.details.starting_positions, 2);
        assert_eq!(report.details.largest_continent_size, 32);
    }

    #[test]
    fn ocean_with_continent_id_fails() {
        let mut map = hand_built_map();
        map.tiles[7].continent_id = 3;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn land_without_continent_id_fails() {
        let mut map = hand_built_map();
        map.tiles[0].continent_id = 0;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn elevation_out_of_range_fails() {
        let mut map = hand_built_map();
        map.tiles[0].elevation = 300;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn dangling_river_bit_fails() {
        let mut map = hand_built_map();
        // Bit toward the eastern neighbor, which is dry land.
        map.tiles[0].river_mask = 2;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn river_bit_toward_ocean_passes() {
        let mut map = hand_built_map();
        // Tile (3, 0) flows east into the coast strip.
        map.tiles[3].river_mask = 2;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[test]
    fn missed_land_target_fails() {
        let cfg = MapConfig {
            land_percent: 80,
            ..base_config()
        };
        let report = validate_map(&hand_built_map(), &cfg, &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn spawn_on_mountain_fails() {
        let mut map = hand_built_map();
        map.tiles[0].terrain = TerrainType::Mountains;
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn crowded_spawns_fail_spacing() {
        let mut map = hand_built_map();
        map.starting_positions[1] = StartingPosition {
            x: 1,
            y: 1,
            player_id: "b".into(),
        };
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }

    #[test]
    fn wrong_spawn_count_fails() {
        let mut map = hand_built_map();
        map.starting_positions.pop();
        let report = validate_map(&map, &base_config(), &player_list(), 3);
        assert!(!report.ok);
    }
}
