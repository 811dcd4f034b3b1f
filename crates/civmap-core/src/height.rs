//! Elevation synthesis: smoothed-noise and pseudofractal height algorithms,
//! polar flattening, shore/mountain calibration, and normalization to the
//! output elevation scale.
//!
//! Heights are built on a working scale of `[0, HMAP_MAX_LEVEL]`, calibrated
//! so the land fraction hits the configured target, then mapped affinely to
//! `[0, 255]` together with the shore and mountain thresholds.

use crate::config::MapConfig;
use crate::intmap::IntMap;
use crate::rng::GameRng;

/// Working-scale ceiling during construction.
pub const HMAP_MAX_LEVEL: i32 = 1000;
/// Colatitude scale: 0 at the poles, this at the equator.
pub const MAX_COLATITUDE: i32 = 1000;
/// Polar band unit used by flattening and ice placement.
pub const ICE_BASE: i32 = 200;
/// Output elevation ceiling.
pub const ELEVATION_MAX: i32 = 255;

/// Calibrated elevation field on the `[0, ELEVATION_MAX]` output scale.
#[derive(Debug, Clone)]
pub struct HeightMap {
    pub map: IntMap,
    /// Cells strictly above this are land.
    pub shore_level: i32,
    /// Cells at or above this qualify as mountainous relief.
    pub mountain_level: i32,
}

impl HeightMap {
    #[inline]
    pub fn elevation(&self, x: usize, y: usize) -> i32 {
        self.map.get(x, y)
    }

    #[inline]
    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.map.get(x, y) > self.shore_level
    }
}

/// Scaled distance from the nearest pole: 0 on the polar rows, rising to
/// [`MAX_COLATITUDE`] on the equator row(s).
pub fn colatitude(y: usize, height: usize) -> i32 {
    let h = height as i64;
    // Offset of the row center from the map's vertical center, in half-rows.
    let from_equator = (2 * y as i64 + 1 - h).abs();
    (i64::from(MAX_COLATITUDE) - from_equator * i64::from(MAX_COLATITUDE) / h) as i32
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

/// Build, flatten, fuzz, calibrate, and normalize the height field for the
/// given mode. `players` only affects the Random algorithm's smoothing count.
pub fn generate_height_map(config: &MapConfig, players: usize, rng: &mut GameRng) -> HeightMap {
    use crate::config::GeneratorMode;
    let mut map = match config.generator {
        GeneratorMode::Random => random_height(config, players, rng),
        GeneratorMode::Fractal | GeneratorMode::Island | GeneratorMode::Fair => {
            fractal_height(config, rng)
        }
    };
    flatten_poles(&mut map, config.flatpoles);
    fuzz(&mut map, rng);
    let (shore, mountain) = calibrate(&map, config.land_percent, config.steepness);
    normalize(map, shore, mountain)
}

/// Smoothed white noise. The smoothing count scales with map area and
/// shrinks for crowded maps so small continents survive.
fn random_height(config: &MapConfig, players: usize, rng: &mut GameRng) -> IntMap {
    let area = config.width * config.height;
    let smooth_count =
        1.max(1 + isqrt(area as u64) as i64 / 10 - players as i64 / 4) as usize;
    let mut map = IntMap::new(config.width, config.height, 0);
    for v in map.data.iter_mut() {
        *v = rng.range(1000 * smooth_count as u32) as i32;
    }
    for _ in 0..smooth_count {
        map.smooth(true);
    }
    map.adjust(0, HMAP_MAX_LEVEL);
    map
}

const UNSET: i32 = i32::MIN;
/// Seed lattice divisions per axis (6x6 lattice points).
const LATTICE_DIV: usize = 5;

/// Pseudofractal midpoint displacement over a coarse seeded lattice.
/// Border seeds are biased downward so map edges drift toward ocean.
fn fractal_height(config: &MapConfig, rng: &mut GameRng) -> IntMap {
    let (w, h) = (config.width, config.height);
    let mut map = IntMap::new(w, h, UNSET);
    let step = (w + h) as i32;
    let edge_drop = (100 - config.land_percent as i32) * step / 100 + step / 3;

    for py in 0..=LATTICE_DIV {
        for px in 0..=LATTICE_DIV {
            let x = px * (w - 1) / LATTICE_DIV;
            let y = py * (h - 1) / LATTICE_DIV;
            let mut v = rng.range_i32(-step, step + 1);
            if px == 0 || py == 0 || px == LATTICE_DIV || py == LATTICE_DIV {
                v -= edge_drop;
            }
            map.set(x, y, v);
        }
    }
    for by in 0..LATTICE_DIV {
        for bx in 0..LATTICE_DIV {
            let xl = bx * (w - 1) / LATTICE_DIV;
            let xr = (bx + 1) * (w - 1) / LATTICE_DIV;
            let yt = by * (h - 1) / LATTICE_DIV;
            let yb = (by + 1) * (h - 1) / LATTICE_DIV;
            subdivide(&mut map, rng, step, xl, yt, xr, yb);
        }
    }
    for v in map.data.iter_mut() {
        if *v == UNSET {
            *v = 0;
        }
    }
    map.adjust(0, HMAP_MAX_LEVEL);
    map
}

/// Recursive diamond-square style refinement of one lattice block. Each
/// unset side midpoint gets the side average plus noise in
/// `[-step/2, step/2]`; the center gets the corner average plus noise; the
/// step shrinks by a third per level.
fn subdivide(map: &mut IntMap, rng: &mut GameRng, step: i32, xl: usize, yt: usize, xr: usize, yb: usize) {
    if xr <= xl || yb <= yt || (xr - xl == 1 && yb - yt == 1) {
        return;
    }
    let xm = (xl + xr) / 2;
    let ym = (yt + yb) / 2;

    let mut displace = |map: &mut IntMap, x: usize, y: usize, base: i32| {
        if map.get(x, y) == UNSET {
            let noise = rng.range_i32(-(step / 2), step / 2 + 1);
            map.set(x, y, base + noise);
        }
    };
    let corner = |map: &IntMap, x: usize, y: usize| map.get(x, y);

    let (tl, tr) = (corner(map, xl, yt), corner(map, xr, yt));
    let (bl, br) = (corner(map, xl, yb), corner(map, xr, yb));
    displace(map, xm, yt, (tl + tr) / 2);
    displace(map, xm, yb, (bl + br) / 2);
    displace(map, xl, ym, (tl + bl) / 2);
    displace(map, xr, ym, (tr + br) / 2);
    displace(map, xm, ym, (tl + tr + bl + br) / 4);

    let next = 2 * step / 3;
    subdivide(map, rng, next, xl, yt, xm, ym);
    subdivide(map, rng, next, xm, yt, xr, ym);
    subdivide(map, rng, next, xl, ym, xm, yb);
    subdivide(map, rng, next, xm, ym, xr, yb);
}

/// Polar damping band: colatitude up to 2.5x [`ICE_BASE`].
const POLAR_BAND: i32 = 5 * ICE_BASE / 2;

/// Scale down elevations near the poles. The factor ramps linearly from
/// `(100 - flatpoles)%` on the polar rows to 100% at the band edge; the
/// outer fifth of the band is additionally capped at 10% so polar land
/// separates from the mainland. Cells within 3 of the map border outside
/// the band are zeroed.
fn flatten_poles(map: &mut IntMap, flatpoles: u32) {
    let (w, h) = (map.width, map.height);
    for y in 0..h {
        let colat = colatitude(y, h);
        for x in 0..w {
            if colat <= POLAR_BAND {
                let mut factor = 100 - flatpoles as i32 * (POLAR_BAND - colat) / POLAR_BAND;
                if colat >= 2 * ICE_BASE {
                    factor = factor.min(10);
                }
                let v = map.get(x, y);
                map.set(x, y, v * factor / 100);
            } else if x < 3 || y < 3 || x + 3 >= w || y + 3 >= h {
                map.set(x, y, 0);
            }
        }
    }
}

/// Final +-4 jitter; keeps shorelines from looking quantized.
fn fuzz(map: &mut IntMap, rng: &mut GameRng) {
    for v in map.data.iter_mut() {
        *v = (*v + rng.range_i32(-4, 5)).clamp(0, HMAP_MAX_LEVEL);
    }
}

/// Pick the shore level so that exactly the configured share of cells sits
/// above it, then derive the mountain level from the steepness slider.
fn calibrate(map: &IntMap, land_percent: u32, steepness: u32) -> (i32, i32) {
    let mut sorted = map.data.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let rank = (sorted.len() * land_percent as usize / 100).min(sorted.len() - 1);
    let shore = sorted[rank];
    let mountain = shore + (HMAP_MAX_LEVEL - shore) * (100 - steepness as i32) / 100;
    (shore, mountain)
}

/// Affine map from the working scale to `[0, ELEVATION_MAX]`, rescaling the
/// calibrated thresholds identically.
fn normalize(mut map: IntMap, shore: i32, mountain: i32) -> HeightMap {
    for v in map.data.iter_mut() {
        *v = (*v).clamp(0, HMAP_MAX_LEVEL) * ELEVATION_MAX / HMAP_MAX_LEVEL;
    }
    HeightMap {
        map,
        shore_level: shore * ELEVATION_MAX / HMAP_MAX_LEVEL,
        mountain_level: mountain * ELEVATION_MAX / HMAP_MAX_LEVEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorMode;

    fn config(mode: GeneratorMode, w: usize, h: usize) -> MapConfig {
        MapConfig {
            width: w,
            height: h,
            generator: mode,
            ..Default::default()
        }
    }

    #[test]
    fn colatitude_is_zero_at_poles_and_max_at_equator() {
        let h = 50;
        assert!(colatitude(0, h) < 50);
        assert!(colatitude(h - 1, h) < 50);
        assert_eq!(colatitude(0, h), colatitude(h - 1, h), "poles symmetric");
        let equator = colatitude(h / 2, h);
        assert!(
            equator > MAX_COLATITUDE - 50,
            "equator colatitude {equator} too low"
        );
    }

    #[test]
    fn heights_stay_on_the_output_scale() {
        for mode in [GeneratorMode::Random, GeneratorMode::Fractal] {
            let mut rng = GameRng::from_seed(b"scale");
            let hm = generate_height_map(&config(mode, 40, 30), 4, &mut rng);
            assert!(hm
                .map
                .data
                .iter()
                .all(|&v| (0..=ELEVATION_MAX).contains(&v)));
            assert!(hm.shore_level >= 0 && hm.shore_level <= ELEVATION_MAX);
            assert!(hm.mountain_level >= hm.shore_level);
        }
    }

    #[test]
    fn land_fraction_tracks_the_target() {
        for (seed, mode) in [
            (&b"t1"[..], GeneratorMode::Random),
            (&b"t2"[..], GeneratorMode::Fractal),
        ] {
            let cfg = config(mode, 60, 40);
            let mut rng = GameRng::from_seed(seed);
            let hm = generate_height_map(&cfg, 4, &mut rng);
            let land = hm
                .map
                .data
                .iter()
                .filter(|&&v| v > hm.shore_level)
                .count();
            let pct = land * 100 / hm.map.data.len();
            assert!(
                (25..=35).contains(&pct),
                "{mode:?}: land {pct}% vs target 30%"
            );
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let cfg = config(GeneratorMode::Fractal, 48, 32);
        let mut rng_a = GameRng::from_seed(b"det");
        let mut rng_b = GameRng::from_seed(b"det");
        let a = generate_height_map(&cfg, 4, &mut rng_a);
        let b = generate_height_map(&cfg, 4, &mut rng_b);
        assert_eq!(a.map.data, b.map.data);
        assert_eq!(a.shore_level, b.shore_level);
        assert_eq!(a.mountain_level, b.mountain_level);
    }

    #[test]
    fn full_flatpoles_suppresses_polar_relief() {
        let cfg = config(GeneratorMode::Fractal, 60, 40);
        let mut rng = GameRng::from_seed(b"poles");
        let hm = generate_height_map(&cfg, 4, &mut rng);
        let row_mean = |y: usize| -> i64 {
            (0..60).map(|x| i64::from(hm.elevation(x, y))).sum::<i64>() / 60
        };
        let polar = row_mean(0).max(row_mean(39));
        let equatorial = row_mean(20);
        assert!(
            polar < equatorial,
            "polar mean {polar} should sit below equatorial mean {equatorial}"
        );
    }

    #[test]
    fn fractal_differs_from_random_for_the_same_seed() {
        let mut rng_a = GameRng::from_seed(b"algo");
        let mut rng_b = GameRng::from_seed(b"algo");
        let a = generate_height_map(&config(GeneratorMode::Random, 40, 30), 4, &mut rng_a);
        let b = generate_height_map(&config(GeneratorMode::Fractal, 40, 30), 4, &mut rng_b);
        assert_ne!(a.map.data, b.map.data);
    }

    #[test]
    fn isqrt_matches_perfect_squares() {
        for n in [0u64, 1, 4, 9, 100, 1024, 4096] {
            let r = isqrt(n);
            assert_eq!(r * r, n, "isqrt({n})");
        }
        assert_eq!(isqrt(2000), 44);
    }
}
