//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

use crate::core::error::{CraftError, Result};

/// Grid cell `(i, j)`, row first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coord {
    pub i: i32,
    pub j: i32,
}

impl Coord {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Chebyshev (L∞) distance
    pub fn chebyshev(&self, other: &Self) -> i32 {
        (self.i - other.i).abs().max((self.j - other.j).abs())
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((i, j): (i32, i32)) -> Self {
        Self { i, j }
    }
}

/// Side length of the square world
///
/// Fixed at environment construction; every coordinate code is only
/// meaningful for the size it was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct WorldSize(pub(crate) usize);

impl WorldSize {
    pub fn new(side: usize) -> Result<Self> {
        if side == 0 || side > i32::MAX as usize {
            return Err(CraftError::InvalidConfig(format!(
                "world size must be positive, got {side}"
            )));
        }
        Ok(Self(side))
    }

    pub fn side(&self) -> usize {
        self.0
    }

    /// Number of cells (the coordinate code space)
    pub fn cells(&self) -> usize {
        self.0 * self.0
    }

    pub fn contains(&self, coord: Coord) -> bool {
        let side = self.0 as i32;
        (0..side).contains(&coord.i) && (0..side).contains(&coord.j)
    }

    /// Row-major flattening
    pub fn encode(&self, coord: Coord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.i as usize * self.0 + coord.j as usize)
    }

    pub fn decode(&self, code: usize) -> Option<Coord> {
        (code < self.cells()).then(|| Coord::new((code / self.0) as i32, (code % self.0) as i32))
    }

    /// All coordinates in code order
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cells()).filter_map(move |code| self.decode(code))
    }
}

impl TryFrom<usize> for WorldSize {
    type Error = CraftError;

    fn try_from(side: usize) -> Result<Self> {
        Self::new(side)
    }
}

impl From<WorldSize> for usize {
    fn from(size: WorldSize) -> usize {
        size.0
    }
}

/// How a worker steps toward its target each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    /// One cell per axis per tick (8 directions)
    #[default]
    Diagonal,
    /// One cell along a single axis per tick, the farther axis first
    AxisAligned,
}

impl Movement {
    pub fn step(&self, origin: Coord, toward: Coord) -> Coord {
        let di = (toward.i - origin.i).clamp(-1, 1);
        let dj = (toward.j - origin.j).clamp(-1, 1);
        match self {
            Movement::Diagonal => Coord::new(origin.i + di, origin.j + dj),
            Movement::AxisAligned => {
                if (toward.i - origin.i).abs() >= (toward.j - origin.j).abs() && di != 0 {
                    Coord::new(origin.i + di, origin.j)
                } else {
                    Coord::new(origin.i, origin.j + dj)
                }
            }
        }
    }
}

/// Step one cell from `origin` toward `toward`: `origin + clip(toward - origin, -1, 1)`
pub fn move_from(origin: Coord, toward: Coord) -> Coord {
    Movement::Diagonal.step(origin, toward)
}

/// Nearest candidate by Chebyshev distance, first match on ties
pub fn get_nearest(candidates: &[Coord], to: Coord) -> Option<Coord> {
    candidates
        .iter()
        .copied()
        .enumerate()
        .min_by_key(|(index, c)| (c.chebyshev(&to), *index))
        .map(|(_, c)| c)
}
