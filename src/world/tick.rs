//! Tick system - advances the world by exactly one step
//!
//! Every worker's assignment runs once, in worker order. Movement reads the
//! position snapshot taken at the start of the tick, so no worker sees
//! another worker's move from the same tick.

use serde::{Deserialize, Serialize};

use crate::core::types::{Coord, Movement};
use crate::world::assignment::{Diagnostic, Effect};
use crate::world::building::Building;
use crate::world::objects::{Resource, Worker};
use crate::world::state::WorldState;

/// Constants the per-tick transition reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRules {
    /// Units banked per completed harvest trip
    pub harvest_yield: i64,
    pub movement: Movement,
}

impl Default for TickRules {
    fn default() -> Self {
        Self {
            harvest_yield: 5,
            movement: Movement::Diagonal,
        }
    }
}

/// Events generated during a world tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickEvent {
    Moved {
        worker: Worker,
        to: Coord,
    },
    PickedUp {
        worker: Worker,
        resource: Resource,
    },
    Banked {
        worker: Worker,
        resource: Resource,
        amount: i64,
    },
    Committed {
        worker: Worker,
        building: Building,
        coord: Coord,
    },
    Completed {
        worker: Worker,
        building: Building,
        coord: Coord,
    },
    Idle {
        worker: Worker,
    },
    Failed {
        worker: Worker,
        diagnostic: Diagnostic,
    },
}

impl TickEvent {
    fn from_outcome(worker: Worker, outcome: Result<Effect, Diagnostic>) -> Self {
        match outcome {
            Ok(Effect::Moved(to)) => TickEvent::Moved { worker, to },
            Ok(Effect::PickedUp(resource)) => TickEvent::PickedUp { worker, resource },
            Ok(Effect::Banked { resource, amount }) => TickEvent::Banked {
                worker,
                resource,
                amount,
            },
            Ok(Effect::Committed { building, coord }) => TickEvent::Committed {
                worker,
                building,
                coord,
            },
            Ok(Effect::Completed { building, coord }) => TickEvent::Completed {
                worker,
                building,
                coord,
            },
            Ok(Effect::Idle) => TickEvent::Idle { worker },
            Err(diagnostic) => TickEvent::Failed { worker, diagnostic },
        }
    }

    pub fn worker(&self) -> Worker {
        match self {
            TickEvent::Moved { worker, .. }
            | TickEvent::PickedUp { worker, .. }
            | TickEvent::Banked { worker, .. }
            | TickEvent::Committed { worker, .. }
            | TickEvent::Completed { worker, .. }
            | TickEvent::Idle { worker }
            | TickEvent::Failed { worker, .. } => *worker,
        }
    }
}

/// Run a single world tick
///
/// Returns one event per worker, in worker order.
pub fn run_world_tick(world: &mut WorldState, rules: &TickRules) -> Vec<TickEvent> {
    let snapshot: Vec<_> = world
        .positions
        .workers()
        .map(|(worker, origin)| (worker, origin, world.assignment(worker)))
        .collect();

    let mut events = Vec::with_capacity(snapshot.len());
    for (worker, origin, assignment) in snapshot {
        let outcome = assignment.execute(worker, origin, world, rules);
        if let Err(diagnostic) = &outcome {
            tracing::debug!(%worker, ?assignment, %diagnostic, "assignment made no progress");
        }
        events.push(TickEvent::from_outcome(worker, outcome));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WorldSize;
    use crate::world::assignment::Assignment;
    use crate::world::state::{BuildingPositions, Positions};
    use crate::world::stockpile::Stockpile;

    #[test]
    fn test_one_event_per_worker_in_order() {
        let workers = [
            (Worker(1), Coord::new(0, 0)),
            (Worker(0), Coord::new(3, 3)),
        ]
        .into_iter()
        .collect();
        let positions = Positions::new(Coord::new(1, 3), Coord::new(3, 1), workers);
        let mut world = WorldState::new(
            WorldSize::new(4).unwrap(),
            positions,
            BuildingPositions::new(),
            Stockpile::default(),
        );
        world.assign(Worker(1), Assignment::GoTo(Coord::new(2, 2)));

        let events = run_world_tick(&mut world, &TickRules::default());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], TickEvent::Idle { worker: Worker(0) });
        assert_eq!(
            events[1],
            TickEvent::Moved {
                worker: Worker(1),
                to: Coord::new(1, 1)
            }
        );
    }

    #[test]
    fn test_workers_move_from_tick_start_snapshot() {
        let workers = [
            (Worker(0), Coord::new(0, 0)),
            (Worker(1), Coord::new(0, 1)),
        ]
        .into_iter()
        .collect();
        let positions = Positions::new(Coord::new(3, 0), Coord::new(3, 3), workers);
        let mut world = WorldState::new(
            WorldSize::new(4).unwrap(),
            positions,
            BuildingPositions::new(),
            Stockpile::default(),
        );
        world.assign(Worker(0), Assignment::GoTo(Coord::new(0, 3)));
        world.assign(Worker(1), Assignment::GoTo(Coord::new(0, 3)));
        run_world_tick(&mut world, &TickRules::default());
        assert_eq!(world.positions.worker(Worker(0)), Some(Coord::new(0, 1)));
        assert_eq!(world.positions.worker(Worker(1)), Some(Coord::new(0, 2)));
    }
}
