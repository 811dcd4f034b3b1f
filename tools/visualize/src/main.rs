//! Diagnostic visualizer — renders a generated map to data/debug/map.png.
//! Not part of the main pipeline; no tests, no clippy target.

use std::fs;
use std::path::Path;

use civmap_core::{generate, GeneratorMode, MapConfig, TerrainType};
use image::{Rgb, RgbImage};

/// Pixels per tile.
const SCALE: u32 = 8;

// ── Colour helpers ────────────────────────────────────────────────────────────

fn terrain_color(terrain: TerrainType) -> [u8; 3] {
    match terrain {
        TerrainType::DeepOcean => [16, 41, 115],
        TerrainType::Ocean => [30, 70, 160],
        TerrainType::Coast => [70, 120, 200],
        TerrainType::Lake => [90, 160, 220],
        TerrainType::Plains => [196, 185, 107],
        TerrainType::Grassland => [110, 160, 70],
        TerrainType::Desert => [228, 205, 140],
        TerrainType::Tundra => [160, 160, 145],
        TerrainType::Forest => [50, 110, 50],
        TerrainType::Jungle => [25, 90, 40],
        TerrainType::Hills => [150, 130, 90],
        TerrainType::Mountains => [110, 100, 100],
        TerrainType::Swamp => [80, 110, 90],
    }
}

/// Darken a color by elevation so relief reads at a glance.
fn shade(color: [u8; 3], elevation: i32) -> Rgb<u8> {
    let f = 70 + elevation.clamp(0, 255) * 50 / 255;
    Rgb([
        (i32::from(color[0]) * f / 100).clamp(0, 255) as u8,
        (i32::from(color[1]) * f / 100).clamp(0, 255) as u8,
        (i32::from(color[2]) * f / 100).clamp(0, 255) as u8,
    ])
}

const RIVER_COLOR: Rgb<u8> = Rgb([60, 140, 235]);
const SPAWN_COLOR: Rgb<u8> = Rgb([240, 40, 40]);

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let mut args = std::env::args().skip(1);
    let seed = args.next().unwrap_or_else(|| "1".into());
    let mode = match args.next().as_deref() {
        Some("random") => GeneratorMode::Random,
        Some("island") => GeneratorMode::Island,
        Some("fair") => GeneratorMode::Fair,
        _ => GeneratorMode::Fractal,
    };

    let config = MapConfig {
        width: 80,
        height: 50,
        generator: mode,
        ..Default::default()
    };
    let players: Vec<String> = (1..=4).map(|i| format!("player-{i}")).collect();
    let map = match generate(seed.as_bytes(), &config, &players, None) {
        Ok(map) => map,
        Err(err) => {
            eprintln!("generation failed: {err}");
            std::process::exit(1);
        }
    };

    let mut img = RgbImage::new(map.width as u32 * SCALE, map.height as u32 * SCALE);
    for y in 0..map.height {
        for x in 0..map.width {
            let tile = map.tile(x, y);
            let base = shade(terrain_color(tile.terrain), tile.elevation);
            let color = if tile.river_mask > 0 { RIVER_COLOR } else { base };
            for py in 0..SCALE {
                for px in 0..SCALE {
                    img.put_pixel(x as u32 * SCALE + px, y as u32 * SCALE + py, color);
                }
            }
        }
    }
    for pos in &map.starting_positions {
        for py in 0..SCALE {
            for px in 0..SCALE {
                img.put_pixel(
                    pos.x as u32 * SCALE + px,
                    pos.y as u32 * SCALE + py,
                    SPAWN_COLOR,
                );
            }
        }
    }

    let dir = Path::new("data/debug");
    if let Err(err) = fs::create_dir_all(dir) {
        eprintln!("cannot create {}: {err}", dir.display());
        std::process::exit(1);
    }
    let path = dir.join("map.png");
    match img.save(&path) {
        Ok(()) => println!("wrote {}", path.display()),
        Err(err) => {
            eprintln!("cannot write {}: {err}", path.display());
            std::process::exit(1);
        }
    }
}
