//! World layer - objects, buildings, stockpile and the per-tick transition

pub mod assignment;
pub mod building;
pub mod construction;
pub mod objects;
pub mod state;
pub mod stockpile;
pub mod tick;

pub use assignment::{Assignment, Diagnostic, Effect};
pub use building::{Building, BuildingCatalog, Cost, Dependencies};
pub use objects::{Resource, Worker};
pub use state::{BuildingPositions, Positions, WorldState};
pub use stockpile::Stockpile;
pub use tick::{run_world_tick, TickEvent, TickRules};
