//! Mutable world state owned by one episode

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Coord, WorldSize};
use crate::world::assignment::Assignment;
use crate::world::building::{Building, Cost};
use crate::world::objects::{Resource, Worker};
use crate::world::stockpile::Stockpile;

/// Tile to building map, used for both completed and pending buildings
pub type BuildingPositions = BTreeMap<Coord, Building>;

/// Where every resource and worker stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positions {
    /// Indexed by `Resource::index`
    pub resources: [Coord; 2],
    pub workers: BTreeMap<Worker, Coord>,
}

impl Positions {
    pub fn new(minerals: Coord, gas: Coord, workers: BTreeMap<Worker, Coord>) -> Self {
        Self {
            resources: [minerals, gas],
            workers,
        }
    }

    pub fn resource(&self, resource: Resource) -> Coord {
        self.resources[resource.index()]
    }

    pub fn worker(&self, worker: Worker) -> Option<Coord> {
        self.workers.get(&worker).copied()
    }

    pub fn set_worker(&mut self, worker: Worker, coord: Coord) {
        self.workers.insert(worker, coord);
    }

    /// The resource lying on `coord`, if any
    pub fn resource_on(&self, coord: Coord) -> Option<Resource> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| self.resource(*r) == coord)
    }

    pub fn workers(&self) -> impl Iterator<Item = (Worker, Coord)> + '_ {
        self.workers.iter().map(|(w, c)| (*w, *c))
    }
}

/// Everything the simulation step mutates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub size: WorldSize,
    pub positions: Positions,
    pub buildings: BuildingPositions,
    pub pending: BuildingPositions,
    pub stockpile: Stockpile,
    pub carrying: BTreeMap<Worker, Option<Resource>>,
    pub assignments: BTreeMap<Worker, Assignment>,
}

impl WorldState {
    /// Fresh world: every worker idle and empty-handed
    pub fn new(
        size: WorldSize,
        positions: Positions,
        buildings: BuildingPositions,
        stockpile: Stockpile,
    ) -> Self {
        let carrying = positions.workers.keys().map(|w| (*w, None)).collect();
        let assignments = positions
            .workers
            .keys()
            .map(|w| (*w, Assignment::DoNothing))
            .collect();
        Self {
            size,
            positions,
            buildings,
            pending: BuildingPositions::new(),
            stockpile,
            carrying,
            assignments,
        }
    }

    /// Building on `coord`, complete or pending
    pub fn occupied(&self, coord: Coord) -> Option<Building> {
        self.buildings
            .get(&coord)
            .or_else(|| self.pending.get(&coord))
            .copied()
    }

    pub fn completed_count(&self, building: Building) -> usize {
        self.buildings.values().filter(|b| **b == building).count()
    }

    /// Completed Nexus tiles in coordinate order
    pub fn nexus_positions(&self) -> Vec<Coord> {
        self.buildings
            .iter()
            .filter(|(_, b)| **b == Building::Nexus)
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn carrying(&self, worker: Worker) -> Option<Resource> {
        self.carrying.get(&worker).copied().flatten()
    }

    pub fn assign(&mut self, worker: Worker, assignment: Assignment) {
        self.assignments.insert(worker, assignment);
    }

    pub fn assignment(&self, worker: Worker) -> Assignment {
        self.assignments
            .get(&worker)
            .copied()
            .unwrap_or(Assignment::DoNothing)
    }

    /// Sum of costs reserved by pending construction
    pub fn pending_cost(&self) -> Cost {
        self.pending
            .values()
            .fold(Cost::default(), |total, b| total + b.cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldState {
        let workers = [(Worker(0), Coord::new(0, 0)), (Worker(1), Coord::new(1, 1))]
            .into_iter()
            .collect();
        let positions = Positions::new(Coord::new(2, 2), Coord::new(3, 3), workers);
        let mut buildings = BuildingPositions::new();
        buildings.insert(Coord::new(0, 3), Building::Nexus);
        WorldState::new(WorldSize::new(4).unwrap(), positions, buildings, Stockpile::default())
    }

    #[test]
    fn test_new_world_is_idle() {
        let world = world();
        assert_eq!(world.assignment(Worker(0)), Assignment::DoNothing);
        assert_eq!(world.carrying(Worker(1)), None);
    }

    #[test]
    fn test_occupied_merges_pending() {
        let mut world = world();
        world.pending.insert(Coord::new(1, 0), Building::Pylon);
        assert_eq!(world.occupied(Coord::new(0, 3)), Some(Building::Nexus));
        assert_eq!(world.occupied(Coord::new(1, 0)), Some(Building::Pylon));
        assert_eq!(world.occupied(Coord::new(2, 0)), None);
        assert_eq!(world.pending_cost(), Building::Pylon.cost());
    }

    #[test]
    fn test_resource_on() {
        let world = world();
        assert_eq!(world.positions.resource_on(Coord::new(3, 3)), Some(Resource::Gas));
        assert_eq!(world.positions.resource_on(Coord::new(0, 0)), None);
    }
}
