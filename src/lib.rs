//! Craftworld - gridworld build-order environments for hierarchical RL
//!
//! Workers harvest minerals and gas and raise buildings on a square grid
//! while a policy follows a list of build instructions. Actions are
//! compound: workers are selected first, then a building or a tile, and
//! every stage is exposed as a masked integer vector.

pub mod actions;
pub mod agent;
pub mod core;
pub mod episode;
pub mod subtask;
pub mod world;
