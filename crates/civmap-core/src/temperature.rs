//! Colatitude-based climate classes.
//!
//! Each tile gets one of four classes from its colatitude, cooled by high
//! elevation and shifted by the global temperature slider. Selectors test
//! classes through bitmasks, so "not frozen" or "hot" conditions are single
//! AND operations.

use serde::{Deserialize, Serialize};

use crate::height::{colatitude, HeightMap, ELEVATION_MAX, MAX_COLATITUDE};

pub const TT_FROZEN: u8 = 1;
pub const TT_COLD: u8 = 2;
pub const TT_TEMPERATE: u8 = 4;
pub const TT_TROPICAL: u8 = 8;
pub const TT_NFROZEN: u8 = TT_COLD | TT_TEMPERATE | TT_TROPICAL;
pub const TT_NHOT: u8 = TT_FROZEN | TT_COLD;
pub const TT_HOT: u8 = TT_TEMPERATE | TT_TROPICAL;
pub const TT_ALL: u8 = TT_FROZEN | TT_NFROZEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureClass {
    Frozen,
    Cold,
    Temperate,
    Tropical,
}

impl TemperatureClass {
    pub fn bit(self) -> u8 {
        match self {
            TemperatureClass::Frozen => TT_FROZEN,
            TemperatureClass::Cold => TT_COLD,
            TemperatureClass::Temperate => TT_TEMPERATE,
            TemperatureClass::Tropical => TT_TROPICAL,
        }
    }
}

/// Per-tile climate classification.
#[derive(Debug, Clone)]
pub struct TemperatureMap {
    classes: Vec<TemperatureClass>,
    width: usize,
}

/// Maximum colatitude reduction from elevation: high peaks read up to 30%
/// closer to the pole than sea level at the same latitude.
const ELEVATION_COOLING: i64 = 3 * MAX_COLATITUDE as i64 / 10;

impl TemperatureMap {
    /// Classify every tile. `temperature` is the 0-100 slider; 50 splits the
    /// bands 30/30/20/20 from equator to pole at sea level.
    pub fn build(heights: &HeightMap, temperature: u32) -> Self {
        let t = i64::from(temperature);
        let tropical_level = (i64::from(MAX_COLATITUDE) - 6 * t).max(0);
        let temperate_level = (600 - 4 * t).max(0);
        let cold_level = (300 - 2 * t).max(0);

        let (w, h) = (heights.map.width, heights.map.height);
        let shore = i64::from(heights.shore_level);
        let mut classes = Vec::with_capacity(w * h);
        for y in 0..h {
            let colat = i64::from(colatitude(y, h));
            for x in 0..w {
                let above_shore = (i64::from(heights.elevation(x, y)) - shore).max(0);
                let cooling =
                    ELEVATION_COOLING * above_shore / (i64::from(ELEVATION_MAX) - shore).max(1);
                let effective = colat - cooling;
                let class = if effective >= tropical_level {
                    TemperatureClass::Tropical
                } else if effective >= temperate_level {
                    TemperatureClass::Temperate
                } else if effective >= cold_level {
                    TemperatureClass::Cold
                } else {
                    TemperatureClass::Frozen
                };
                classes.push(class);
            }
        }
        Self { classes, width: w }
    }

    #[inline]
    pub fn class_at(&self, x: usize, y: usize) -> TemperatureClass {
        self.classes[y * self.width + x]
    }

    /// True when the tile's class bit intersects `mask`.
    #[inline]
    pub fn has_type(&self, x: usize, y: usize, mask: u8) -> bool {
        self.class_at(x, y).bit() & mask != 0
    }
}
