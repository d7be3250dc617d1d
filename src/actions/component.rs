//! Action components and their integer codes
//!
//! Workers, coordinates and buildings each map onto a dense code range.
//! Every operation takes an explicit [`ActionDims`] so no sizing lives in
//! global state.

use serde::{Deserialize, Serialize};

use crate::core::config::EnvConfig;
use crate::core::error::{CraftError, Result};
use crate::core::types::{Coord, WorldSize};
use crate::world::building::{Building, BuildingCatalog};
use crate::world::objects::Worker;

/// Sizes every action encoding depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDims {
    pub world_size: WorldSize,
    pub num_workers: usize,
    pub catalog: BuildingCatalog,
}

impl ActionDims {
    pub fn new(world_size: WorldSize, num_workers: usize, catalog: BuildingCatalog) -> Self {
        Self {
            world_size,
            num_workers,
            catalog,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(
            config.world_size,
            config.num_workers,
            BuildingCatalog::new(config.include_assimilator),
        )
    }

    pub fn coord_space(&self) -> usize {
        self.world_size.cells()
    }

    pub fn building_space(&self) -> usize {
        self.catalog.len()
    }

    /// One row per worker plus the target row
    pub fn rows(&self) -> usize {
        self.num_workers + 1
    }

    /// Width shared by every input row: `max(3, 1 + W² + B)`
    pub fn row_width(&self) -> usize {
        WORKER_ROW_WIDTH.max(1 + self.coord_space() + self.building_space())
    }
}

/// Worker row codes: no-op, don't choose, choose
pub const WORKER_ROW_WIDTH: usize = 3;
pub const WORKER_NOOP: usize = 0;
pub const WORKER_SKIP: usize = 1;
pub const WORKER_CHOOSE: usize = 2;

/// A value that round-trips through a dense integer code
///
/// `parse(x.to_int(dims), dims) == x` for every legal `x`, and
/// `parse(n, dims)?.to_int(dims) == n` for every `n < space(dims)`.
pub trait ActionComponent: Sized {
    fn parse(code: usize, dims: &ActionDims) -> Result<Self>;

    fn space(dims: &ActionDims) -> usize;

    fn to_int(&self, dims: &ActionDims) -> usize;
}

fn out_of_range(component: &'static str, code: usize, space: usize) -> CraftError {
    CraftError::CodeOutOfRange {
        component,
        code,
        space,
    }
}

impl ActionComponent for Worker {
    fn parse(code: usize, dims: &ActionDims) -> Result<Self> {
        if code < dims.num_workers {
            Ok(Worker(code))
        } else {
            Err(out_of_range("worker", code, dims.num_workers))
        }
    }

    fn space(dims: &ActionDims) -> usize {
        dims.num_workers
    }

    fn to_int(&self, _dims: &ActionDims) -> usize {
        self.0
    }
}

impl ActionComponent for Coord {
    fn parse(code: usize, dims: &ActionDims) -> Result<Self> {
        dims.world_size
            .decode(code)
            .ok_or_else(|| out_of_range("coord", code, dims.coord_space()))
    }

    fn space(dims: &ActionDims) -> usize {
        dims.coord_space()
    }

    /// Panics if the coordinate lies outside the world
    fn to_int(&self, dims: &ActionDims) -> usize {
        match dims.world_size.encode(*self) {
            Some(code) => code,
            None => panic!("{self} lies outside a world of side {}", dims.world_size.side()),
        }
    }
}

impl ActionComponent for Building {
    fn parse(code: usize, dims: &ActionDims) -> Result<Self> {
        dims.catalog
            .get(code)
            .ok_or_else(|| out_of_range("building", code, dims.building_space()))
    }

    fn space(dims: &ActionDims) -> usize {
        dims.building_space()
    }

    /// Panics if the building is not in the active catalog
    fn to_int(&self, dims: &ActionDims) -> usize {
        match dims.catalog.index_of(*self) {
            Some(code) => code,
            None => panic!("{self} is not in the active building catalog"),
        }
    }
}

/// One decoded action component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Worker(Worker),
    Coord(Coord),
    Building(Building),
}

impl From<Worker> for Component {
    fn from(worker: Worker) -> Self {
        Component::Worker(worker)
    }
}

impl From<Coord> for Component {
    fn from(coord: Coord) -> Self {
        Component::Coord(coord)
    }
}

impl From<Building> for Component {
    fn from(building: Building) -> Self {
        Component::Building(building)
    }
}
