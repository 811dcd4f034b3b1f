//! The generator's output artifact: a pure-data tile grid plus starting
//! positions. Callers own serialization; everything here derives serde.

use serde::{Deserialize, Serialize};

use crate::ruleset::{Resource, TerrainAffinity};
use crate::temperature::TemperatureClass;
use crate::terrain::TerrainType;

/// Opaque player identifier, carried through to starting positions.
pub type PlayerId = String;

/// River mask bit: a river connection to the northern neighbor.
pub const RIVER_N: u8 = 1;
pub const RIVER_E: u8 = 2;
pub const RIVER_S: u8 = 4;
pub const RIVER_W: u8 = 8;

/// One map cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub terrain: TerrainType,
    /// 0-255 after normalization.
    pub elevation: i32,
    pub temperature: TemperatureClass,
    /// 0 for ocean; lakes carry the id of the nearest land component.
    pub continent_id: u32,
    /// Cardinal river connections, N=1 E=2 S=4 W=8.
    pub river_mask: u8,
    pub resource: Option<Resource>,
    /// Placement affinities of this tile's terrain, from the ruleset.
    pub affinities: TerrainAffinity,
}

/// A placed spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingPosition {
    pub x: usize,
    pub y: usize,
    pub player_id: PlayerId,
}

/// Complete generated map. Row-major tiles; `tiles[y * width + x]` is the
/// cell at `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Tile>,
    pub starting_positions: Vec<StartingPosition>,
    /// The seed bytes generation was keyed on.
    pub seed: Vec<u8>,
}

impl MapData {
    #[inline]
    pub fn tile(&self, x: usize, y: usize) -> &Tile {
        &self.tiles[y * self.width + x]
    }

    /// Share of land tiles in percent. Lakes are water and do not count.
    pub fn land_percent(&self) -> usize {
        let land = self
            .tiles
            .iter()
            .filter(|t| t.terrain.is_land())
            .count();
        land * 100 / self.tiles.len()
    }

    /// Terminal-friendly preview: one glyph per tile, `*` for spawns,
    /// `~` for river-bearing tiles.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = self.tile(x, y);
                let spawn = self
                    .starting_positions
                    .iter()
                    .any(|s| s.x == x && s.y == y);
                let glyph = if spawn {
                    '*'
                } else if tile.river_mask != 0 {
                    '~'
                } else {
                    tile.terrain.glyph()
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}
