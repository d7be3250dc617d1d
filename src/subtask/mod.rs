//! Subtask world - rooms crossed by collecting and refining materials
//!
//! Each instruction block is a room; paying for the water bridge with the
//! block's collected and refined materials opens the way to the next room.

pub mod env;
pub mod objects;
pub mod room;
pub mod world;

pub use env::{SubtaskAction, SubtaskEnv, SubtaskObservation, SubtaskStep, SubtaskSummary};
pub use objects::{Item, LowerAction, Material, Subtask, Terrain, Tile};
pub use room::Room;
pub use world::{Hazards, SubtaskWorld, Transition};
