//! End-to-end scenarios over the full pipeline: land targets, terrain
//! domains, continents, rivers, spawns, determinism, and config rejection.

use std::collections::HashSet;

use civmap_core::{
    generate, GenerationError, GeneratorMode, MapConfig, MapData, StartPosMode, TerrainType,
};

fn players(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("player-{i}")).collect()
}

fn config(mode: GeneratorMode, w: usize, h: usize, land: u32) -> MapConfig {
    MapConfig {
        width: w,
        height: h,
        generator: mode,
        land_percent: land,
        ..Default::default()
    }
}

/// Count 4-connected groups of river-bearing tiles.
fn river_components(map: &MapData) -> usize {
    let (w, h) = (map.width, map.height);
    let river = |x: usize, y: usize| map.tile(x, y).river_mask > 0;
    let mut visited = vec![false; w * h];
    let mut components = 0;
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if visited[i] || !river(x, y) {
                continue;
            }
            components += 1;
            let mut stack = vec![(x, y)];
            visited[i] = true;
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in [(0i32, -1i32), (1, 0), (0, 1), (-1, 0)] {
                    let (nx, ny) = (cx as i32 + dx, cy as i32 + dy);
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if !visited[ny * w + nx] && river(nx, ny) {
                        visited[ny * w + nx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    components
}

fn continent_sizes(map: &MapData) -> Vec<usize> {
    let max_id = map
        .tiles
        .iter()
        .filter(|t| t.terrain.is_land())
        .map(|t| t.continent_id)
        .max()
        .unwrap_or(0);
    let mut sizes = vec![0usize; max_id as usize + 1];
    for t in &map.tiles {
        if t.terrain.is_land() {
            sizes[t.continent_id as usize] += 1;
        }
    }
    sizes.remove(0);
    sizes
}

#[test]
fn small_random_map_hits_its_targets() {
    let map = generate(b"1", &config(GeneratorMode::Random, 40, 25, 30), &players(4), None)
        .expect("generation must succeed");

    let land_pct = map.land_percent();
    assert!(
        (25..=35).contains(&land_pct),
        "land {land_pct}% outside 25..=35"
    );

    let land_kinds: HashSet<TerrainType> = map
        .tiles
        .iter()
        .filter(|t| t.terrain.is_land())
        .map(|t| t.terrain)
        .collect();
    assert!(
        land_kinds.len() >= 3,
        "only {} land terrain kinds: {land_kinds:?}",
        land_kinds.len()
    );

    assert!(
        map.tiles.iter().any(|t| t.river_mask > 0),
        "no rivers at all"
    );

    assert_eq!(map.starting_positions.len(), 4);
    for pos in &map.starting_positions {
        assert!(
            map.tile(pos.x, pos.y).terrain.is_land(),
            "spawn for {} on water",
            pos.player_id
        );
    }
}

#[test]
fn larger_random_map_grows_a_real_continent() {
    let map = generate(b"2", &config(GeneratorMode::Random, 80, 50, 30), &players(6), None)
        .expect("generation must succeed");

    let land_pct = map.land_percent();
    assert!(
        (25..=35).contains(&land_pct),
        "land {land_pct}% outside 25..=35"
    );

    let largest = continent_sizes(&map).into_iter().max().unwrap_or(0);
    assert!(largest >= 80, "largest continent only {largest} tiles");
}

#[test]
fn fractal_map_splits_into_continents_with_rivers() {
    let map = generate(
        b"fractal-A",
        &config(GeneratorMode::Fractal, 60, 40, 40),
        &players(4),
        None,
    )
    .expect("generation must succeed");

    let land_pct = map.land_percent();
    assert!(
        (35..=45).contains(&land_pct),
        "land {land_pct}% outside 35..=45"
    );

    let continents = continent_sizes(&map).len();
    assert!(continents >= 2, "only {continents} continent(s)");

    let networks = river_components(&map);
    assert!(networks >= 3, "only {networks} river network(s)");
}

#[test]
fn island_mode_spreads_players_and_land() {
    let cfg = MapConfig {
        start_pos_mode: StartPosMode::TwoOnThree,
        ..config(GeneratorMode::Island, 60, 40, 30)
    };
    let map = generate(b"island-A", &cfg, &players(6), None).expect("generation must succeed");

    // At most ceil(2 * 6 / 3) = 4 spawns per continent.
    let mut per_continent = std::collections::HashMap::new();
    for pos in &map.starting_positions {
        *per_continent
            .entry(map.tile(pos.x, pos.y).continent_id)
            .or_insert(0usize) += 1;
    }
    for (continent, count) in &per_continent {
        assert!(
            *count <= 4,
            "continent {continent} holds {count} spawns (cap 4)"
        );
    }

    // No island dominates the world.
    let sizes = continent_sizes(&map);
    let total: usize = sizes.iter().sum();
    let largest = sizes.into_iter().max().unwrap_or(0);
    assert!(
        largest * 100 <= total * 40,
        "largest continent {largest} of {total} land tiles exceeds 40%"
    );
}

#[test]
fn identical_inputs_produce_identical_bytes() {
    let cfg = config(GeneratorMode::Island, 60, 40, 30);
    let a = generate(b"island-A", &cfg, &players(6), None).unwrap();
    let b = generate(b"island-A", &cfg, &players(6), None).unwrap();
    assert_eq!(a, b);

    let bytes_a = serde_json::to_vec(&a).unwrap();
    let bytes_b = serde_json::to_vec(&b).unwrap();
    assert_eq!(bytes_a, bytes_b, "serialized output must be byte-identical");
}

#[test]
fn too_many_players_for_the_map_is_an_invalid_config() {
    let err = generate(b"any", &config(GeneratorMode::Random, 40, 25, 30), &players(20), None)
        .unwrap_err();
    assert!(
        matches!(err, GenerationError::InvalidConfig { .. }),
        "expected InvalidConfig, got {err:?}"
    );
}

#[test]
fn fair_mode_converges_to_a_valid_map() {
    let map = generate(b"fair-A", &config(GeneratorMode::Fair, 60, 40, 30), &players(4), None)
        .expect("fair mode must converge");
    assert_eq!(map.starting_positions.len(), 4);
    let land_pct = map.land_percent();
    assert!(
        (25..=35).contains(&land_pct),
        "land {land_pct}% outside 25..=35"
    );
}

#[test]
fn every_tile_satisfies_the_output_domain() {
    for (seed, mode) in [
        (&b"dom-1"[..], GeneratorMode::Random),
        (b"dom-2", GeneratorMode::Fractal),
        (b"dom-3", GeneratorMode::Island),
    ] {
        let map = generate(seed, &config(mode, 60, 40, 30), &players(4), None).unwrap();
        for tile in &map.tiles {
            assert!((0..=255).contains(&tile.elevation));
            assert!(tile.river_mask <= 15);
            let ocean = tile.terrain.is_ocean();
            assert_eq!(
                ocean,
                tile.continent_id == 0,
                "{:?} at ({}, {}) with id {}",
                tile.terrain,
                tile.x,
                tile.y,
                tile.continent_id
            );
        }
    }
}
