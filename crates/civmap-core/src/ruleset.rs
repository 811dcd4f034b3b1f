//! Read-only ruleset data consumed by the generator: per-terrain placement
//! affinities, the weighted terrain picker built on them, and the resource
//! tables. The generator never hard-codes a biome table; everything flows
//! through the `Ruleset` record handed to `generate`.

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::temperature::{TT_ALL, TT_HOT, TT_NFROZEN, TT_NHOT};
use crate::terrain::{TerrainType, LAND_TERRAINS};

/// Placement affinity axes. Selectors reference these; `None` in a selector
/// slot means the axis is unused for that roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapProperty {
    Mountainous,
    Dry,
    Wet,
    Foliage,
    Cold,
    Frozen,
    Tropical,
    Temperate,
    Green,
}

/// Per-terrain affinity record, each axis in `[0, 100]`.
///
/// `unused` is the weight of the null axis; it stays 0 so a selector with no
/// target axis falls through to uniform selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainAffinity {
    pub mountainous: u8,
    pub dry: u8,
    pub wet: u8,
    pub foliage: u8,
    pub cold: u8,
    pub frozen: u8,
    pub tropical: u8,
    pub temperate: u8,
    pub green: u8,
    pub unused: u8,
}

impl TerrainAffinity {
    pub fn get(&self, property: MapProperty) -> u8 {
        match property {
            MapProperty::Mountainous => self.mountainous,
            MapProperty::Dry => self.dry,
            MapProperty::Wet => self.wet,
            MapProperty::Foliage => self.foliage,
            MapProperty::Cold => self.cold,
            MapProperty::Frozen => self.frozen,
            MapProperty::Tropical => self.tropical,
            MapProperty::Temperate => self.temperate,
            MapProperty::Green => self.green,
        }
    }
}

/// One row of a terrain resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub resource: Resource,
    pub weight: u32,
    /// Temperature classes (bitmask) the resource may appear in.
    pub temp_mask: u8,
}

/// Placeable tile resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Wheat,
    Cattle,
    Horses,
    Iron,
    Coal,
    Gold,
    Gems,
    Oil,
    Fish,
    Whales,
    Furs,
    Game,
    Spices,
    Oasis,
}

fn terrain_index(terrain: TerrainType) -> usize {
    match terrain {
        TerrainType::DeepOcean => 0,
        TerrainType::Ocean => 1,
        TerrainType::Coast => 2,
        TerrainType::Lake => 3,
        TerrainType::Plains => 4,
        TerrainType::Grassland => 5,
        TerrainType::Desert => 6,
        TerrainType::Tundra => 7,
        TerrainType::Forest => 8,
        TerrainType::Jungle => 9,
        TerrainType::Hills => 10,
        TerrainType::Mountains => 11,
        TerrainType::Swamp => 12,
    }
}

const TERRAIN_COUNT: usize = 13;

/// Immutable generator inputs: affinity weights and resource tables.
#[derive(Debug, Clone)]
pub struct Ruleset {
    affinities: [TerrainAffinity; TERRAIN_COUNT],
    /// Percent of matching tiles that receive a resource.
    resource_density: [u32; TERRAIN_COUNT],
    resources: Vec<Vec<ResourceEntry>>,
}

impl Ruleset {
    /// The built-in ruleset.
    pub fn standard() -> Self {
        let mut affinities = [TerrainAffinity::default(); TERRAIN_COUNT];
        let mut set = |t: TerrainType, a: TerrainAffinity| {
            affinities[terrain_index(t)] = a;
        };
        set(
            TerrainType::Plains,
            TerrainAffinity {
                green: 50,
                temperate: 50,
                dry: 20,
                ..Default::default()
            },
        );
        set(
            TerrainType::Grassland,
            TerrainAffinity {
                green: 50,
                temperate: 50,
                wet: 10,
                ..Default::default()
            },
        );
        set(
            TerrainType::Desert,
            TerrainAffinity {
                dry: 100,
                tropical: 50,
                ..Default::default()
            },
        );
        set(
            TerrainType::Tundra,
            TerrainAffinity {
                cold: 50,
                frozen: 30,
                dry: 10,
                ..Default::default()
            },
        );
        set(
            TerrainType::Forest,
            TerrainAffinity {
                foliage: 50,
                temperate: 50,
                green: 10,
                cold: 10,
                ..Default::default()
            },
        );
        set(
            TerrainType::Jungle,
            TerrainAffinity {
                foliage: 50,
                tropical: 50,
                wet: 50,
                ..Default::default()
            },
        );
        set(
            TerrainType::Hills,
            TerrainAffinity {
                mountainous: 30,
                green: 50,
                ..Default::default()
            },
        );
        set(
            TerrainType::Mountains,
            TerrainAffinity {
                mountainous: 70,
                ..Default::default()
            },
        );
        set(
            TerrainType::Swamp,
            TerrainAffinity {
                wet: 100,
                foliage: 10,
                tropical: 10,
                cold: 10,
                ..Default::default()
            },
        );

        let mut resource_density = [0u32; TERRAIN_COUNT];
        let mut resources: Vec<Vec<ResourceEntry>> = vec![Vec::new(); TERRAIN_COUNT];
        let mut table = |t: TerrainType, density: u32, rows: &[(Resource, u32, u8)]| {
            resource_density[terrain_index(t)] = density;
            resources[terrain_index(t)] = rows
                .iter()
                .map(|&(resource, weight, temp_mask)| ResourceEntry {
                    resource,
                    weight,
                    temp_mask,
                })
                .collect();
        };
        table(
            TerrainType::Grassland,
            8,
            &[(Resource::Cattle, 3, TT_NFROZEN), (Resource::Wheat, 2, TT_HOT)],
        );
        table(
            TerrainType::Plains,
            10,
            &[(Resource::Wheat, 3, TT_NFROZEN), (Resource::Horses, 2, TT_NFROZEN)],
        );
        table(
            TerrainType::Desert,
            8,
            &[
                (Resource::Oasis, 2, TT_HOT),
                (Resource::Oil, 1, TT_ALL),
                (Resource::Gold, 1, TT_ALL),
            ],
        );
        table(
            TerrainType::Tundra,
            8,
            &[(Resource::Game, 2, TT_NHOT), (Resource::Furs, 2, TT_NHOT)],
        );
        table(
            TerrainType::Forest,
            10,
            &[(Resource::Game, 3, TT_ALL), (Resource::Furs, 1, TT_NHOT)],
        );
        table(
            TerrainType::Jungle,
            10,
            &[(Resource::Gems, 2, TT_HOT), (Resource::Spices, 2, TT_HOT)],
        );
        table(
            TerrainType::Hills,
            12,
            &[(Resource::Iron, 3, TT_ALL), (Resource::Coal, 2, TT_ALL)],
        );
        table(
            TerrainType::Mountains,
            8,
            &[(Resource::Gold, 2, TT_ALL), (Resource::Iron, 1, TT_ALL)],
        );
        table(
            TerrainType::Swamp,
            6,
            &[(Resource::Spices, 1, TT_HOT), (Resource::Oil, 1, TT_ALL)],
        );
        table(
            TerrainType::Coast,
            10,
            &[(Resource::Fish, 3, TT_ALL), (Resource::Whales, 1, TT_NHOT)],
        );
        table(
            TerrainType::Ocean,
            5,
            &[(Resource::Fish, 1, TT_ALL), (Resource::Whales, 2, TT_NHOT)],
        );
        table(TerrainType::Lake, 10, &[(Resource::Fish, 3, TT_ALL)]);

        Self {
            affinities,
            resource_density,
            resources,
        }
    }

    pub fn affinity(&self, terrain: TerrainType) -> TerrainAffinity {
        self.affinities[terrain_index(terrain)]
    }

    pub fn resource_density(&self, terrain: TerrainType) -> u32 {
        self.resource_density[terrain_index(terrain)]
    }

    pub fn resource_table(&self, terrain: TerrainType) -> &[ResourceEntry] {
        &self.resources[terrain_index(terrain)]
    }

    /// Weighted random land terrain whose `target` affinity is positive.
    ///
    /// A positive `prefer` affinity doubles a candidate's weight; a positive
    /// `avoid` affinity disqualifies it. When the constraints leave nothing
    /// to pick, `prefer` is dropped first, then `avoid`; Grassland is the
    /// terminal fallback.
    pub fn pick_terrain(
        &self,
        rng: &mut GameRng,
        target: MapProperty,
        prefer: Option<MapProperty>,
        avoid: Option<MapProperty>,
    ) -> TerrainType {
        if let Some(t) = self.try_pick(rng, target, prefer, avoid) {
            return t;
        }
        if prefer.is_some() {
            if let Some(t) = self.try_pick(rng, target, None, avoid) {
                return t;
            }
        }
        if avoid.is_some() {
            if let Some(t) = self.try_pick(rng, target, None, None) {
                return t;
            }
        }
        TerrainType::Grassland
    }

    fn try_pick(
        &self,
        rng: &mut GameRng,
        target: MapProperty,
        prefer: Option<MapProperty>,
        avoid: Option<MapProperty>,
    ) -> Option<TerrainType> {
        let weight_of = |terrain: TerrainType| -> u32 {
            let affinity = self.affinity(terrain);
            if let Some(p) = avoid {
                if affinity.get(p) > 0 {
                    return 0;
                }
            }
            let mut w = u32::from(affinity.get(target));
            if let Some(p) = prefer {
                if affinity.get(p) > 0 {
                    w *= 2;
                }
            }
            w
        };
        let total: u32 = LAND_TERRAINS.iter().map(|&t| weight_of(t)).sum();
        if total == 0 {
            return None;
        }
        let mut roll = rng.range(total);
        for &terrain in &LAND_TERRAINS {
            let w = weight_of(terrain);
            if roll < w {
                return Some(terrain);
            }
            roll -= w;
        }
        None
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocean_terrains_have_no_affinities() {
        let rules = Ruleset::standard();
        for t in [TerrainType::DeepOcean, TerrainType::Ocean, TerrainType::Coast] {
            assert_eq!(rules.affinity(t), TerrainAffinity::default());
        }
    }

    #[test]
    fn pick_terrain_honors_target() {
        let rules = Ruleset::standard();
        let mut rng = GameRng::from_seed(b"pick");
        for _ in 0..200 {
            let t = rules.pick_terrain(&mut rng, MapProperty::Mountainous, None, None);
            assert!(
                matches!(t, TerrainType::Mountains | TerrainType::Hills),
                "mountainous pick must be Mountains or Hills, got {t:?}"
            );
        }
    }

    #[test]
    fn pick_terrain_avoid_disqualifies() {
        let rules = Ruleset::standard();
        let mut rng = GameRng::from_seed(b"avoid");
        for _ in 0..200 {
            let t = rules.pick_terrain(
                &mut rng,
                MapProperty::Foliage,
                None,
                Some(MapProperty::Tropical),
            );
            assert_ne!(t, TerrainType::Jungle, "avoid=Tropical must exclude Jungle");
        }
    }

    #[test]
    fn pick_terrain_falls_back_to_grassland() {
        // Frozen target with every frozen-capable terrain also avoided.
        let mut rules = Ruleset::standard();
        rules.affinities[super::terrain_index(TerrainType::Tundra)].frozen = 0;
        let mut rng = GameRng::from_seed(b"fallback");
        let t = rules.pick_terrain(&mut rng, MapProperty::Frozen, None, None);
        assert_eq!(t, TerrainType::Grassland);
    }

    #[test]
    fn resource_tables_match_density_gates() {
        let rules = Ruleset::standard();
        for &t in &LAND_TERRAINS {
            if rules.resource_density(t) > 0 {
                assert!(
                    !rules.resource_table(t).is_empty(),
                    "{t:?} has density but no table"
                );
            }
        }
        assert_eq!(rules.resource_density(TerrainType::DeepOcean), 0);
    }
}
