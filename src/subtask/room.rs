//! Room generation and per-tick room upkeep
//!
//! A room is `side x side`. Its last column is the crossing: one Water tile
//! and `side - 1` Mountains in random order. The remaining columns hold a
//! random scatter of materials and factories.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::types::Coord;
use crate::subtask::objects::{Item, Subtask, Terrain, Tile};

/// Occupied tiles of one room
pub type Room = BTreeMap<Coord, Tile>;

/// Upper bound (exclusive) on a block's random length
pub fn chunk_size(side: usize) -> usize {
    side * side - side - 1
}

/// Split `n_lines` instruction lines into blocks
///
/// Every block is followed by a `Cross(Water)` line, and the lengths
/// plus the crossings add up to exactly `n_lines`.
pub fn generate_blocks(n_lines: usize, side: usize, rng: &mut impl Rng) -> Vec<Vec<Subtask>> {
    let chunk = chunk_size(side).max(1);
    let mut remaining = n_lines;
    let mut blocks = Vec::new();
    while remaining > 0 {
        let size = rng.gen_range(0..chunk).min(remaining - 1);
        let block: Vec<Subtask> = (0..size)
            .filter_map(|_| Subtask::BLOCK.choose(rng).copied())
            .collect();
        remaining -= block.len() + 1;
        blocks.push(block);
    }
    blocks
}

/// Flatten blocks into instruction lines
pub fn block_lines(blocks: &[Vec<Subtask>]) -> Vec<Subtask> {
    blocks
        .iter()
        .flat_map(|block| {
            block
                .iter()
                .copied()
                .chain(std::iter::once(Subtask::Cross(Terrain::Water)))
        })
        .collect()
}

/// Supplies a block leaves behind to pay for its bridge
pub fn requirements(block: &[Subtask]) -> BTreeMap<Item, usize> {
    let mut counts = BTreeMap::new();
    for item in block.iter().filter_map(Subtask::requirement) {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

/// Random room with the crossing in the last column
///
/// Scattered objects are drawn with replacement, so a later draw on the
/// same tile replaces an earlier one.
pub fn generate_room(side: usize, rng: &mut impl Rng) -> Room {
    let interior: Vec<Coord> = (0..side as i32)
        .flat_map(|i| (0..side as i32 - 1).map(move |j| Coord::new(i, j)))
        .collect();
    let mut room = Room::new();
    let num_objects = rng.gen_range(0..interior.len());
    for _ in 0..num_objects {
        let (Some(&coord), Some(&tile)) = (interior.choose(rng), Tile::NECESSARY.choose(rng))
        else {
            continue;
        };
        room.insert(coord, tile);
    }

    let mut limina = vec![Tile::Terrain(Terrain::Water)];
    limina.extend(std::iter::repeat(Tile::Terrain(Terrain::Mountain)).take(side - 1));
    limina.shuffle(rng);
    for (i, tile) in limina.into_iter().enumerate() {
        room.insert(Coord::new(i as i32, side as i32 - 1), tile);
    }
    room
}

/// Place any missing necessary object
///
/// Candidate tiles are empty interior tiles or tiles whose object has a
/// duplicate elsewhere in the room.
pub fn make_feasible(room: &mut Room, side: usize, rng: &mut impl Rng) {
    for necessary in Tile::NECESSARY {
        if room.values().any(|tile| *tile == necessary) {
            continue;
        }
        let mut counts: BTreeMap<Tile, usize> = BTreeMap::new();
        for tile in room.values() {
            *counts.entry(*tile).or_insert(0) += 1;
        }
        let free: Vec<Coord> = (0..side as i32)
            .flat_map(|i| (0..side as i32 - 1).map(move |j| Coord::new(i, j)))
            .filter(|coord| match room.get(coord) {
                None => true,
                Some(tile) => !tile.is_liminal() && counts.get(tile).copied().unwrap_or(0) > 1,
            })
            .collect();
        match free.choose(rng) {
            Some(&coord) => {
                room.insert(coord, necessary);
            }
            None => tracing::debug!(?necessary, "no free tile to restore room feasibility"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtask::objects::Material;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_blocks_account_for_every_line() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for n in 1..30 {
            let blocks = generate_blocks(n, 4, &mut rng);
            let lines = block_lines(&blocks);
            assert_eq!(lines.len(), n);
            assert_eq!(lines.last(), Some(&Subtask::Cross(Terrain::Water)));
            assert!(blocks.iter().all(|b| b.len() < chunk_size(4)));
        }
    }

    #[test]
    fn test_room_has_one_water_in_last_column() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let room = generate_room(4, &mut rng);
        let crossing: Vec<Tile> = (0..4).filter_map(|i| room.get(&Coord::new(i, 3)).copied()).collect();
        assert_eq!(crossing.len(), 4);
        assert_eq!(
            crossing.iter().filter(|t| **t == Tile::Terrain(Terrain::Water)).count(),
            1
        );
        assert!(crossing.iter().all(Tile::is_liminal));
        assert!(room
            .iter()
            .filter(|(c, _)| c.j < 3)
            .all(|(_, t)| !t.is_liminal()));
    }

    #[test]
    fn test_make_feasible_restores_necessary_objects() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut room = Room::new();
        room.insert(Coord::new(0, 0), Tile::Material(Material::Wood));
        make_feasible(&mut room, 4, &mut rng);
        for necessary in Tile::NECESSARY {
            assert!(room.values().any(|t| *t == necessary));
        }
        assert_eq!(room.len(), 3);
    }

    #[test]
    fn test_requirements_count_block_items() {
        let block = [
            Subtask::Collect(Material::Wood),
            Subtask::Collect(Material::Wood),
            Subtask::Refine(Material::Stone),
        ];
        let required = requirements(&block);
        assert_eq!(required.get(&Item::Raw(Material::Wood)), Some(&2));
        assert_eq!(required.get(&Item::Refined(Material::Stone)), Some(&1));
        assert_eq!(required.len(), 2);
    }
}
