//! Construction - reserve, pay, walk, complete

use crate::core::types::Coord;
use crate::world::assignment::{Assignment, Diagnostic, Effect};
use crate::world::building::Building;
use crate::world::objects::Worker;
use crate::world::state::WorldState;
use crate::world::tick::TickRules;

/// Advance one build order by a tick
///
/// The first tick that targets an unreserved tile commits: the tile enters
/// `pending` and the cost leaves the stockpile. Later ticks never pay again.
/// Once the worker starts a tick on the tile the building completes and the
/// worker goes idle.
pub fn advance_build_order(
    building: Building,
    coord: Coord,
    worker: Worker,
    origin: Coord,
    world: &mut WorldState,
    rules: &TickRules,
) -> Result<Effect, Diagnostic> {
    if let Some(existing) = world.buildings.get(&coord).copied() {
        world.assign(worker, Assignment::DoNothing);
        if existing == building {
            // Another worker finished the same order
            return Ok(Effect::Idle);
        }
        return Err(Diagnostic::AlreadyBuilt {
            building: existing,
            coord,
        });
    }

    let mut committed = false;
    match world.pending.get(&coord).copied() {
        Some(reserved) if reserved != building => {
            world.assign(worker, Assignment::DoNothing);
            return Err(Diagnostic::Reserved {
                building: reserved,
                coord,
            });
        }
        Some(_) => {}
        None => {
            world.pending.insert(coord, building);
            world.stockpile.pay(&building.cost());
            committed = true;
            tracing::debug!(%worker, %building, %coord, "construction committed");
        }
    }

    if origin == coord {
        world.pending.remove(&coord);
        world.buildings.insert(coord, building);
        world.assign(worker, Assignment::DoNothing);
        tracing::debug!(%worker, %building, %coord, "construction completed");
        return Ok(Effect::Completed { building, coord });
    }

    let next = rules.movement.step(origin, coord);
    world.positions.set_worker(worker, next);
    if committed {
        Ok(Effect::Committed { building, coord })
    } else {
        Ok(Effect::Moved(next))
    }
}
