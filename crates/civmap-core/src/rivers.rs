//! Downhill river routing: pick elevated, mountainous start points, walk
//! each network toward the sea scoring cardinal steps, soften the terrain a
//! river crosses, then derive the per-tile connection bitmasks.

use crate::height::HeightMap;
use crate::intmap::CARDINAL_OFFSETS;
use crate::rng::GameRng;
use crate::ruleset::Ruleset;
use crate::terrain::TerrainType;

/// Maximum path length of one network.
const MAX_PATH: usize = 30;
/// Neighborhood radius of the local density gate.
const DENSITY_RADIUS: i32 = 5;
/// Reject a start when more than this percent of the neighborhood already
/// carries rivers.
const DENSITY_LIMIT_PCT: usize = 25;
/// Step score for reaching the sea.
const OCEAN_SCORE: i32 = 1000;
/// Step bonus for river-friendly terrain.
const SUITABLE_BONUS: i32 = 50;

/// Result of the river stage. `masks` is the per-tile 4-bit connection
/// field; `networks` counts the paths that actually flowed (length >= 2).
pub struct RiverNetworks {
    pub masks: Vec<u8>,
    pub networks: usize,
}

fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Terrain a river prefers to flow through.
fn river_suitable(rules: &Ruleset, terrain: TerrainType) -> bool {
    let a = rules.affinity(terrain);
    a.green > 0 || a.foliage > 0 || a.wet > 0
}

/// Route the river networks. `river_flags` may already hold island-stage
/// rivers; they participate in the density gate and the final masks.
pub fn generate_rivers(
    terrain: &mut [TerrainType],
    heights: &HeightMap,
    rules: &Ruleset,
    river_flags: &mut [bool],
    rng: &mut GameRng,
) -> RiverNetworks {
    let (w, h) = (heights.map.width, heights.map.height);
    let target_networks = 3.max(isqrt((w * h) as u64) as usize / 8);

    let candidates = start_candidates(terrain, heights, rules, river_flags, rng, target_networks);

    let mut networks = 0;
    for &start in &candidates {
        if networks >= target_networks {
            break;
        }
        if river_flags[start] || too_dense(start, river_flags, w, h) {
            continue;
        }
        let path = walk_network(start, terrain, heights, rules, river_flags, rng);
        if path.len() < 2 {
            continue;
        }
        networks += 1;
        for &i in &path {
            river_flags[i] = true;
            match terrain[i] {
                TerrainType::Desert if rng.chance(40) => terrain[i] = TerrainType::Plains,
                TerrainType::Mountains if rng.chance(40) => terrain[i] = TerrainType::Hills,
                _ => {}
            }
        }
    }

    RiverNetworks {
        masks: build_masks(terrain, river_flags, w, h),
        networks,
    }
}

/// Shuffled start candidates: elevated mountainous land first, then two
/// fallback sweeps that drop the affinity requirement and admit any land
/// above 180 and 160 when the primary pool runs short.
fn start_candidates(
    terrain: &[TerrainType],
    heights: &HeightMap,
    rules: &Ruleset,
    river_flags: &[bool],
    rng: &mut GameRng,
    wanted: usize,
) -> Vec<usize> {
    let w = heights.map.width;
    let collect = |pred: &dyn Fn(usize) -> bool| -> Vec<usize> {
        (0..terrain.len())
            .filter(|&i| terrain[i].is_land() && !river_flags[i] && pred(i))
            .collect()
    };
    let elevation_of = |i: usize| heights.elevation(i % w, i / w);

    let mut primary: Vec<usize> = collect(&|i| {
        elevation_of(i) > 150 && rules.affinity(terrain[i]).mountainous > 20
    });
    rng.shuffle(&mut primary);
    let mut result = primary;

    for threshold in [180, 160] {
        if result.len() >= wanted {
            break;
        }
        let mut fallback: Vec<usize> = collect(&|i| elevation_of(i) > threshold);
        fallback.retain(|i| !result.contains(i));
        rng.shuffle(&mut fallback);
        result.extend(fallback);
    }
    result
}

/// True when more than the limit share of the surrounding square already
/// carries rivers.
fn too_dense(start: usize, river_flags: &[bool], w: usize, h: usize) -> bool {
    let (cx, cy) = ((start % w) as i32, (start / w) as i32);
    let mut total = 0usize;
    let mut rivers = 0usize;
    for dy in -DENSITY_RADIUS..=DENSITY_RADIUS {
        for dx in -DENSITY_RADIUS..=DENSITY_RADIUS {
            let (x, y) = (cx + dx, cy + dy);
            if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
                continue;
            }
            total += 1;
            if river_flags[y as usize * w + x as usize] {
                rivers += 1;
            }
        }
    }
    rivers * 100 > total * DENSITY_LIMIT_PCT
}

/// Grow one path from `start`, at most [`MAX_PATH`] tiles, choosing each
/// step uniformly among the three best-scoring cardinal neighbors. Stops on
/// ocean contact or when every direction is forbidden.
fn walk_network(
    start: usize,
    terrain: &[TerrainType],
    heights: &HeightMap,
    rules: &Ruleset,
    river_flags: &[bool],
    rng: &mut GameRng,
) -> Vec<usize> {
    let (w, h) = (heights.map.width, heights.map.height);
    let mut path = vec![start];
    let mut current = start;

    while path.len() < MAX_PATH {
        let (cx, cy) = (current % w, current / w);
        let current_elev = heights.elevation(cx, cy);

        // (score, index, is_ocean), in N/E/S/W order for determinism.
        let mut choices: Vec<(i32, usize, bool)> = Vec::with_capacity(4);
        for (dx, dy) in CARDINAL_OFFSETS {
            let (nx, ny) = (cx as i32 + dx, cy as i32 + dy);
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            let ni = ny * w + nx;
            let t = terrain[ni];
            if t.is_ocean() {
                choices.push((OCEAN_SCORE, ni, true));
                continue;
            }
            if !t.is_land() || river_flags[ni] || path.contains(&ni) {
                continue;
            }
            let neighbor_elev = heights.elevation(nx, ny);
            if neighbor_elev > current_elev && rules.affinity(t).mountainous > 80 {
                continue;
            }
            let mut score = 2 * (current_elev - neighbor_elev);
            if river_suitable(rules, t) {
                score += SUITABLE_BONUS;
            }
            choices.push((score, ni, false));
        }
        if choices.is_empty() {
            break;
        }
        choices.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let top = choices.len().min(3);
        let (_, next, is_ocean) = choices[rng.range(top as u32) as usize];
        if is_ocean {
            break;
        }
        path.push(next);
        current = next;
    }
    path
}

/// A river tile's mask ORs every cardinal direction that points at another
/// river tile or at salt water. Flags on tiles that later stopped being
/// land (a flagged speck sunk by the tiny-island pass) are ignored.
fn build_masks(terrain: &[TerrainType], river_flags: &[bool], w: usize, h: usize) -> Vec<u8> {
    let mut masks = vec![0u8; terrain.len()];
    for i in 0..terrain.len() {
        if !river_flags[i] || !terrain[i].is_land() {
            continue;
        }
        let (x, y) = (i % w, i / w);
        let mut mask = 0u8;
        for (bit, (dx, dy)) in CARDINAL_OFFSETS.iter().enumerate() {
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let ni = ny as usize * w + nx as usize;
            if river_flags[ni] || terrain[ni].is_ocean() {
                mask |= 1 << bit;
            }
        }
        masks[i] = mask;
    }
    masks
}
