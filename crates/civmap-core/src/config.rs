//! Generator configuration and its validation.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Which height/terrain algorithm family drives the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorMode {
    /// Smoothed white noise heights.
    Random,
    /// Pseudofractal midpoint-displacement heights.
    Fractal,
    /// Bucket-driven island placement.
    Island,
    /// Island placement with equal per-player masses and a validation
    /// retry loop.
    Fair,
}

/// How players are distributed across continents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartPosMode {
    /// Everyone on the single largest usable continent.
    SingleContinent,
    /// At most ceil(2P/3) players per continent, preferring large ones.
    TwoOnThree,
    /// Round-robin over every continent with habitable land.
    AllContinents,
    /// Fewest continents that fit all players with a ceil(P/2) cap.
    Variable,
}

/// Relative shares of island land spent on each special biome account.
/// Only Island and Fair modes read these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPercentages {
    pub river: u32,
    pub mountain: u32,
    pub desert: u32,
    pub forest: u32,
    pub swamp: u32,
}

impl Default for TerrainPercentages {
    fn default() -> Self {
        Self {
            river: 10,
            mountain: 15,
            desert: 15,
            forest: 20,
            swamp: 10,
        }
    }
}

/// Immutable generation parameters. Player identity travels separately
/// through `generate`; the config describes only the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub width: usize,
    pub height: usize,
    pub generator: GeneratorMode,
    /// Target land share in percent, 15-85.
    pub land_percent: u32,
    /// 0-100; higher values raise the mountain threshold.
    pub steepness: u32,
    /// 0-100; polar elevation damping strength.
    pub flatpoles: u32,
    /// 0-100; global temperature slider, 50 = Earth-like.
    pub temperature: u32,
    pub terrain_percentages: TerrainPercentages,
    pub start_pos_mode: StartPosMode,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 50,
            generator: GeneratorMode::Fractal,
            land_percent: 30,
            steepness: 30,
            flatpoles: 100,
            temperature: 50,
            terrain_percentages: TerrainPercentages::default(),
            start_pos_mode: StartPosMode::Variable,
        }
    }
}

/// Hard cap on supported players regardless of map area.
pub const MAX_PLAYERS: usize = 32;

impl MapConfig {
    /// Upper bound on player count for this map area: one player per 100
    /// tiles, capped at [`MAX_PLAYERS`].
    pub fn max_players_for_map(&self) -> usize {
        ((self.width * self.height) / 100).clamp(1, MAX_PLAYERS)
    }

    /// Reject configurations no stage could satisfy. `players` is the
    /// ordered player list handed to `generate`.
    pub fn validate(&self, players: usize) -> Result<(), GenerationError> {
        let fail = |reason: String| Err(GenerationError::InvalidConfig { reason });
        if self.width < 8 || self.height < 8 {
            return fail(format!(
                "map must be at least 8x8, got {}x{}",
                self.width, self.height
            ));
        }
        if self.width * self.height < 64 {
            return fail(format!(
                "map area must be at least 64 tiles, got {}",
                self.width * self.height
            ));
        }
        if !(15..=85).contains(&self.land_percent) {
            return fail(format!(
                "land_percent must be in 15..=85, got {}",
                self.land_percent
            ));
        }
        for (name, value) in [
            ("steepness", self.steepness),
            ("flatpoles", self.flatpoles),
            ("temperature", self.temperature),
        ] {
            if value > 100 {
                return fail(format!("{name} must be in 0..=100, got {value}"));
            }
        }
        for (name, value) in [
            ("river", self.terrain_percentages.river),
            ("mountain", self.terrain_percentages.mountain),
            ("desert", self.terrain_percentages.desert),
            ("forest", self.terrain_percentages.forest),
            ("swamp", self.terrain_percentages.swamp),
        ] {
            if value > 100 {
                return fail(format!(
                    "terrain percentage {name} must be in 0..=100, got {value}"
                ));
            }
        }
        if players == 0 {
            return fail("at least one player is required".into());
        }
        let max = self.max_players_for_map();
        if players > max {
            return fail(format!(
                "{players} players exceed the limit of {max} for a {}x{} map",
                self.width, self.height
            ));
        }
        Ok(())
    }
}
