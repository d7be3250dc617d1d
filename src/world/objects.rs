//! Workers and resources

use serde::{Deserialize, Serialize};

/// Harvestable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Minerals,
    Gas,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Minerals, Resource::Gas];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Resource::Minerals => "m",
            Resource::Gas => "g",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Minerals => write!(f, "minerals"),
            Resource::Gas => write!(f, "gas"),
        }
    }
}

/// Controllable worker, ordered by index
///
/// Displayed 1-based (`W1`, `W2`, ...); the wrapped index is 0-based and is
/// also the worker's action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Worker(pub usize);

impl Worker {
    /// The first `count` workers in order
    pub fn all(count: usize) -> impl Iterator<Item = Worker> {
        (0..count).map(Worker)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    pub fn symbol(&self) -> String {
        (self.0 + 1).to_string()
    }
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "W{}", self.0 + 1)
    }
}
