//! Procedural task generation - dependency forest, instruction lines, world
//!
//! Everything here draws from the episode's own PRNG so a stored initial
//! state regenerates the same episode exactly.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Coord, WorldSize};
use crate::world::building::{Building, BuildingCatalog, Dependencies};
use crate::world::objects::Worker;
use crate::world::state::{BuildingPositions, Positions, WorldState};
use crate::world::stockpile::Stockpile;

/// One instruction: build `building`, counted toward success when `required`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub required: bool,
    pub building: Building,
}

impl Line {
    pub fn required(building: Building) -> Self {
        Self {
            required: true,
            building,
        }
    }

    pub fn prerequisite(building: Building) -> Self {
        Self {
            required: false,
            building,
        }
    }
}

/// Draw a dependency forest over the buildable part of `catalog`
///
/// Buildings are shuffled and cut into chains of at most `max_depth`; each
/// building depends on its predecessor in the chain. Nexus and Assimilator
/// are always roots.
pub fn generate_dependencies(
    catalog: &BuildingCatalog,
    max_depth: usize,
    rng: &mut ChaCha8Rng,
) -> Dependencies {
    let mut buildings: Vec<Building> = catalog
        .buildable()
        .into_iter()
        .filter(|b| !matches!(b, Building::Nexus | Building::Assimilator))
        .collect();
    buildings.shuffle(rng);

    let mut dependencies = Dependencies::new();
    for chain in buildings.chunks(max_depth.max(1)) {
        for pair in chain.windows(2) {
            dependencies.insert(pair[1], pair[0]);
        }
    }
    dependencies
}

/// Draw an instruction of up to `n_lines` lines
///
/// Each required building is preceded by whichever of its prerequisites are
/// not listed yet, as non-required lines. A building is only drawn when its
/// unlisted chain fits in the lines that remain.
pub fn generate_lines(
    n_lines: usize,
    buildable: &[Building],
    dependencies: &Dependencies,
    rng: &mut ChaCha8Rng,
) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::with_capacity(n_lines);
    let unlisted = |lines: &[Line], building: Building| {
        dependencies
            .chain(building)
            .into_iter()
            .filter(|p| !lines.iter().any(|l| l.building == *p))
            .collect::<Vec<_>>()
    };

    while lines.len() < n_lines {
        let remaining = n_lines - lines.len();
        let candidates: Vec<Building> = buildable
            .iter()
            .copied()
            .filter(|b| unlisted(&lines, *b).len() < remaining)
            .collect();
        let Some(building) = candidates.choose(rng).copied() else {
            break;
        };
        for prerequisite in unlisted(&lines, building) {
            lines.push(Line::prerequisite(prerequisite));
        }
        lines.push(Line::required(building));
    }
    lines
}

/// Required line counts per building
pub fn required_counts(lines: &[Line]) -> BTreeMap<Building, usize> {
    let mut counts = BTreeMap::new();
    for line in lines.iter().filter(|l| l.required) {
        *counts.entry(line.building).or_insert(0) += 1;
    }
    counts
}

/// Whether the completed buildings cover every required line
pub fn is_success(lines: &[Line], world: &WorldState) -> bool {
    required_counts(lines)
        .iter()
        .all(|(building, count)| world.completed_count(*building) >= *count)
}

/// Fraction of required lines covered by completed buildings
pub fn progress(lines: &[Line], world: &WorldState) -> f64 {
    let counts = required_counts(lines);
    let total: usize = counts.values().sum();
    if total == 0 {
        return 1.0;
    }
    let covered: usize = counts
        .iter()
        .map(|(building, count)| world.completed_count(*building).min(*count))
        .sum();
    covered as f64 / total as f64
}

/// Place minerals, gas and a starting Nexus on distinct tiles, and workers
/// anywhere
pub fn generate_world(
    size: WorldSize,
    num_workers: usize,
    stockpile: Stockpile,
    rng: &mut ChaCha8Rng,
) -> WorldState {
    let tiles = rand::seq::index::sample(rng, size.cells(), 3);
    let mut coords = tiles.iter().filter_map(|code| size.decode(code));
    let mut next = || coords.next().unwrap_or_default();
    let (minerals, gas, nexus) = (next(), next(), next());

    let side = size.side() as i32;
    let workers = Worker::all(num_workers)
        .map(|w| (w, Coord::new(rng.gen_range(0..side), rng.gen_range(0..side))))
        .collect();

    let mut buildings = BuildingPositions::new();
    buildings.insert(nexus, Building::Nexus);
    WorldState::new(
        size,
        Positions::new(minerals, gas, workers),
        buildings,
        stockpile,
    )
}
