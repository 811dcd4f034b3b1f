//! Biome-conditioned resource placement. Every terrain has a density gate
//! and a small weighted table keyed by temperature class; tiles are visited
//! in row-major order so placement is a pure function of the seed stream.

use crate::rng::GameRng;
use crate::ruleset::{Resource, Ruleset};
use crate::temperature::TemperatureMap;
use crate::terrain::TerrainType;

/// Place at most one resource per tile.
pub fn place_resources(
    terrain: &[TerrainType],
    tmap: &TemperatureMap,
    rules: &Ruleset,
    width: usize,
    rng: &mut GameRng,
) -> Vec<Option<Resource>> {
    let mut resources = vec![None; terrain.len()];
    for (i, &t) in terrain.iter().enumerate() {
        let density = rules.resource_density(t);
        if density == 0 {
            continue;
        }
        if !rng.chance(density) {
            continue;
        }
        let (x, y) = (i % width, i / width);
        let table: Vec<_> = rules
            .resource_table(t)
            .iter()
            .filter(|entry| tmap.has_type(x, y, entry.temp_mask))
            .collect();
        let total: u32 = table.iter().map(|e| e.weight).sum();
        if total == 0 {
            continue;
        }
        let mut roll = rng.range(total);
        for entry in table {
            if roll < entry.weight {
                resources[i] = Some(entry.resource);
                break;
            }
            roll -= entry.weight;
        }
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeneratorMode, MapConfig};
    use crate::continents::process_oceans_and_continents;
    use crate::height::generate_height_map;
    use crate::relief::classify_base_terrain;

    fn resource_world(seed: &[u8]) -> (Vec<TerrainType>, TemperatureMap, Vec<Option<Resource>>) {
        let cfg = MapConfig {
            width: 60,
            height: 40,
            generator: GeneratorMode::Fractal,
            ..Default::default()
        };
        let rules = Ruleset::standard();
        let mut rng = GameRng::from_seed(seed);
        let heights = generate_height_map(&cfg, 4, &mut rng);
        let tmap = TemperatureMap::build(&heights, cfg.temperature);
        let mut terrain = classify_base_terrain(&heights, &tmap, &rules, &mut rng);
        process_oceans_and_continents(&mut terrain, &heights, &tmap, cfg.generator, &mut rng);
        let resources = place_resources(&terrain, &tmap, &rules, 60, &mut rng);
        (terrain, tmap, resources)
    }

    #[test]
    fn resources_respect_their_terrain_tables() {
        let rules = Ruleset::standard();
        let (terrain, _, resources) = resource_world(b"res-1");
        for (i, r) in resources.iter().enumerate() {
            let Some(resource) = r else { continue };
            let allowed: Vec<Resource> = rules
                .resource_table(terrain[i])
                .iter()
                .map(|e| e.resource)
                .collect();
            assert!(
                allowed.contains(resource),
                "{resource:?} not allowed on {:?}",
                terrain[i]
            );
        }
    }

    #[test]
    fn resources_respect_temperature_masks() {
        let rules = Ruleset::standard();
        let (terrain, tmap, resources) = resource_world(b"res-2");
        for (i, r) in resources.iter().enumerate() {
            let Some(resource) = r else { continue };
            let (x, y) = (i % 60, i / 60);
            let ok = rules
                .resource_table(terrain[i])
                .iter()
                .any(|e| e.resource == *resource && tmap.has_type(x, y, e.temp_mask));
            assert!(ok, "{resource:?} placed outside its temperature band");
        }
    }

    #[test]
    fn density_stays_in_a_sane_band() {
        let (terrain, _, resources) = resource_world(b"res-3");
        let eligible = terrain
            .iter()
            .filter(|t| Ruleset::standard().resource_density(**t) > 0)
            .count();
        let placed = resources.iter().flatten().count();
        assert!(placed > 0, "no resources at all");
        assert!(
            placed * 100 <= eligible * 25,
            "{placed} resources on {eligible} eligible tiles"
        );
    }

    #[test]
    fn placement_is_deterministic() {
        let (_, _, a) = resource_world(b"res-4");
        let (_, _, b) = resource_world(b"res-4");
        assert_eq!(a, b);
    }
}
