//! Assignments - deferred per-worker commands executed once per tick

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{get_nearest, Coord};
use crate::world::building::Building;
use crate::world::construction::advance_build_order;
use crate::world::objects::{Resource, Worker};
use crate::world::state::WorldState;
use crate::world::tick::TickRules;

/// Standing command for one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Assignment {
    /// Walk toward a tile and stay there
    GoTo(Coord),
    /// Reserve, pay for and construct a building
    BuildOrder { building: Building, coord: Coord },
    /// Shuttle between a resource tile and the nearest Nexus
    Harvest(Resource),
    #[default]
    DoNothing,
}

/// Observable outcome of one executed assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Moved(Coord),
    PickedUp(Resource),
    Banked { resource: Resource, amount: i64 },
    Committed { building: Building, coord: Coord },
    Completed { building: Building, coord: Coord },
    Idle,
}

/// Why an assignment made no progress this tick
///
/// These are reported, never raised: illegal-but-benign commands are common
/// while a policy explores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Diagnostic {
    #[error("gas at {0} cannot be harvested without an Assimilator")]
    GasWithoutAssimilator(Coord),

    #[error("no Nexus to deliver {0} to")]
    NoNexus(Resource),

    #[error("{coord} already holds a {building}")]
    AlreadyBuilt { building: Building, coord: Coord },

    #[error("{coord} is reserved for a {building}")]
    Reserved { building: Building, coord: Coord },

    #[error("{0} has no position")]
    Unplaced(Worker),
}

impl Assignment {
    /// Run one tick of this command for `worker`
    ///
    /// `origin` is the worker's position at the start of the tick, so workers
    /// never observe each other's moves within a tick.
    pub fn execute(
        &self,
        worker: Worker,
        origin: Coord,
        world: &mut WorldState,
        rules: &TickRules,
    ) -> Result<Effect, Diagnostic> {
        match *self {
            Assignment::DoNothing => Ok(Effect::Idle),
            Assignment::GoTo(target) => {
                let next = rules.movement.step(origin, target);
                world.positions.set_worker(worker, next);
                if next == origin {
                    Ok(Effect::Idle)
                } else {
                    Ok(Effect::Moved(next))
                }
            }
            Assignment::Harvest(resource) => harvest(resource, worker, origin, world, rules),
            Assignment::BuildOrder { building, coord } => {
                advance_build_order(building, coord, worker, origin, world, rules)
            }
        }
    }
}

fn harvest(
    resource: Resource,
    worker: Worker,
    origin: Coord,
    world: &mut WorldState,
    rules: &TickRules,
) -> Result<Effect, Diagnostic> {
    match world.carrying(worker) {
        None => {
            let tile = world.positions.resource(resource);
            let next = rules.movement.step(origin, tile);
            world.positions.set_worker(worker, next);
            if next != tile {
                return Ok(Effect::Moved(next));
            }
            if resource == Resource::Gas && world.buildings.get(&tile) != Some(&Building::Assimilator)
            {
                return Err(Diagnostic::GasWithoutAssimilator(tile));
            }
            world.carrying.insert(worker, Some(resource));
            Ok(Effect::PickedUp(resource))
        }
        Some(load) => {
            let nexus = get_nearest(&world.nexus_positions(), origin)
                .ok_or(Diagnostic::NoNexus(load))?;
            let next = rules.movement.step(origin, nexus);
            world.positions.set_worker(worker, next);
            if next != nexus {
                return Ok(Effect::Moved(next));
            }
            world.stockpile.add(load, rules.harvest_yield);
            world.carrying.insert(worker, None);
            Ok(Effect::Banked {
                resource: load,
                amount: rules.harvest_yield,
            })
        }
    }
}
