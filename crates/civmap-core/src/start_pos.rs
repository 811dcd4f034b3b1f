//! Balanced spawn placement: habitability scoring, per-mode continent
//! plans, and greedy distance-spread placement with spacing fallback.

use crate::config::StartPosMode;
use crate::error::GenerationError;
use crate::intmap::cardinal_neighbors;
use crate::map_data::{PlayerId, StartingPosition};
use crate::terrain::TerrainType;

/// Floor of the spacing requirement, in Chebyshev distance.
const MIN_SPACING_FLOOR: usize = 3;
/// Initial attempt plus this many spacing-halving retries.
const SPACING_RETRIES: u32 = 3;

/// Everything the placer knows about one continent.
struct ContinentStat {
    id: u32,
    land_tiles: usize,
    /// (tile index, habitability), best first.
    candidates: Vec<(usize, i32)>,
}

/// Placement result: the spawns plus the spacing actually enforced (the
/// base spacing, unless the fallback had to halve it).
#[derive(Debug)]
pub struct PlacedStarts {
    pub positions: Vec<StartingPosition>,
    pub min_spacing: usize,
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

/// Habitability of a tile, or None when the tile cannot host a spawn:
/// water, mountains, and land whose every cardinal neighbor is ocean.
fn habitability(
    i: usize,
    terrain: &[TerrainType],
    river_masks: &[u8],
    w: usize,
    h: usize,
) -> Option<i32> {
    let t = terrain[i];
    if t.is_water() || t == TerrainType::Mountains {
        return None;
    }
    let (x, y) = (i % w, i / w);
    let mut all_ocean = true;
    let mut near_water_bonus = false;
    for (nx, ny) in cardinal_neighbors(x, y, w, h) {
        let ni = ny * w + nx;
        if !terrain[ni].is_ocean() {
            all_ocean = false;
        }
        if terrain[ni] == TerrainType::Coast || river_masks[ni] > 0 {
            near_water_bonus = true;
        }
    }
    if all_ocean {
        return None;
    }
    let mut score = match t {
        TerrainType::Grassland | TerrainType::Plains => 2,
        TerrainType::Forest | TerrainType::Hills | TerrainType::Tundra => 1,
        _ => 0,
    };
    if near_water_bonus {
        score += 1;
    }
    Some(score)
}

/// Build per-continent stats, largest land area first.
fn continent_stats(
    terrain: &[TerrainType],
    ids: &[u32],
    river_masks: &[u8],
    w: usize,
    h: usize,
) -> Vec<ContinentStat> {
    let max_id = ids.iter().copied().max().unwrap_or(0);
    let mut stats: Vec<ContinentStat> = (1..=max_id)
        .map(|id| ContinentStat {
            id,
            land_tiles: 0,
            candidates: Vec::new(),
        })
        .collect();
    for (i, &id) in ids.iter().enumerate() {
        if id == 0 || !terrain[i].is_land() {
            continue;
        }
        let stat = &mut stats[(id - 1) as usize];
        stat.land_tiles += 1;
        if let Some(score) = habitability(i, terrain, river_masks, w, h) {
            stat.candidates.push((i, score));
        }
    }
    for stat in stats.iter_mut() {
        stat.candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    }
    stats.sort_by(|a, b| b.land_tiles.cmp(&a.land_tiles).then(a.id.cmp(&b.id)));
    stats
}

/// Assign a continent (by index into `stats`) to every player slot, or
/// None when the mode's plan cannot fit the player count at all.
fn plan_continents(
    mode: StartPosMode,
    stats: &[ContinentStat],
    players: usize,
) -> Option<Vec<usize>> {
    let usable: Vec<usize> = (0..stats.len())
        .filter(|&s| !stats[s].candidates.is_empty())
        .collect();
    if usable.is_empty() {
        return None;
    }
    match mode {
        StartPosMode::SingleContinent => {
            // Largest continent that can hold everyone; stats are already
            // sorted by land area.
            let best = usable
                .iter()
                .copied()
                .find(|&s| stats[s].candidates.len() >= players)?;
            Some(vec![best; players])
        }
        StartPosMode::TwoOnThree => {
            let cap = (2 * players).div_ceil(3);
            fill_by_capacity(stats, &usable, players, cap)
        }
        StartPosMode::AllContinents => {
            let mut remaining_capacity: Vec<usize> =
                usable.iter().map(|&s| stats[s].candidates.len()).collect();
            let mut plan = Vec::with_capacity(players);
            let mut cursor = 0usize;
            for _ in 0..players {
                let mut spun = 0;
                while remaining_capacity[cursor % usable.len()] == 0 {
                    cursor += 1;
                    spun += 1;
                    if spun > usable.len() {
                        return None;
                    }
                }
                let slot = cursor % usable.len();
                remaining_capacity[slot] -= 1;
                plan.push(usable[slot]);
                cursor += 1;
            }
            Some(plan)
        }
        StartPosMode::Variable => {
            // Fewest continents under a soft ceil(P/2) cap; when the world
            // has too few continents for that cap, relax it until the
            // players fit or capacity is truly exhausted.
            let mut cap = players.div_ceil(2);
            loop {
                if let Some(plan) = fill_by_capacity(stats, &usable, players, cap) {
                    return Some(plan);
                }
                if cap >= players {
                    return None;
                }
                cap += 1;
            }
        }
    }
}

/// Fill continents in order with at most `cap` players each (and no more
/// than each continent's candidate count).
fn fill_by_capacity(
    stats: &[ContinentStat],
    usable: &[usize],
    players: usize,
    cap: usize,
) -> Option<Vec<usize>> {
    let mut plan = Vec::with_capacity(players);
    for &s in usable {
        let take = cap
            .min(stats[s].candidates.len())
            .min(players - plan.len());
        plan.extend(std::iter::repeat(s).take(take));
        if plan.len() == players {
            return Some(plan);
        }
    }
    None
}

fn chebyshev(a: (usize, usize), b: (usize, usize)) -> usize {
    let dx = a.0.abs_diff(b.0);
    let dy = a.1.abs_diff(b.1);
    dx.max(dy)
}

/// One placement sweep at a fixed spacing. Players take the best-scoring
/// remaining tile on their planned continent that keeps the spacing from
/// everyone already placed on that continent.
fn try_place(
    stats: &[ContinentStat],
    plan: &[usize],
    players: &[PlayerId],
    spacing: usize,
    w: usize,
) -> Option<Vec<StartingPosition>> {
    let mut placed: Vec<(usize, (usize, usize))> = Vec::with_capacity(players.len());
    let mut taken: Vec<usize> = Vec::with_capacity(players.len());
    let mut positions = Vec::with_capacity(players.len());
    for (p, player) in players.iter().enumerate() {
        let s = plan[p];
        let spot = stats[s].candidates.iter().find(|&&(idx, _)| {
            if taken.contains(&idx) {
                return false;
            }
            let at = (idx % w, idx / w);
            placed
                .iter()
                .filter(|(ps, _)| *ps == s)
                .all(|&(_, other)| chebyshev(at, other) >= spacing)
        })?;
        let (idx, _) = *spot;
        taken.push(idx);
        placed.push((s, (idx % w, idx / w)));
        positions.push(StartingPosition {
            x: idx % w,
            y: idx / w,
            player_id: player.clone(),
        });
    }
    Some(positions)
}

/// Place all spawns. The spacing starts at `max(3, sqrt(land/players))`
/// and halves on failure, up to three retries; exhausting them fails the
/// generation.
pub fn place_starting_positions(
    terrain: &[TerrainType],
    ids: &[u32],
    river_masks: &[u8],
    players: &[PlayerId],
    mode: StartPosMode,
    w: usize,
    h: usize,
) -> Result<PlacedStarts, GenerationError> {
    let stats = continent_stats(terrain, ids, river_masks, w, h);
    let total_land: usize = stats.iter().map(|s| s.land_tiles).sum();
    let Some(plan) = plan_continents(mode, &stats, players.len()) else {
        return Err(GenerationError::StartingPositionsImpossible { attempts: 0 });
    };

    let base = MIN_SPACING_FLOOR
        .max(isqrt((total_land / players.len().max(1)) as u64) as usize);
    let mut spacing = base;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(positions) = try_place(&stats, &plan, players, spacing, w) {
            return Ok(PlacedStarts {
                positions,
                min_spacing: spacing,
            });
        }
        if attempts > SPACING_RETRIES {
            return Err(GenerationError::StartingPositionsImpossible { attempts });
        }
        spacing = (spacing / 2).max(1);
    }
}
