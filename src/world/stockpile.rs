//! Stockpile - banked minerals and gas

use serde::{Deserialize, Serialize};

use crate::world::building::Cost;
use crate::world::objects::Resource;

/// Banked resources
///
/// Amounts are signed: with cost enforcement disabled a commitment may
/// drive the stockpile below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    pub minerals: i64,
    pub gas: i64,
}

impl Stockpile {
    pub fn new(minerals: i64, gas: i64) -> Self {
        Self { minerals, gas }
    }

    pub fn get(&self, resource: Resource) -> i64 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Gas => self.gas,
        }
    }

    pub fn add(&mut self, resource: Resource, amount: i64) {
        match resource {
            Resource::Minerals => self.minerals += amount,
            Resource::Gas => self.gas += amount,
        }
    }

    /// Check if the stockpile covers `cost`
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.shortfall(cost).is_zero()
    }

    /// What is missing to pay `cost`, zero per resource when covered
    pub fn shortfall(&self, cost: &Cost) -> Cost {
        Cost {
            minerals: (cost.minerals - self.minerals).max(0),
            gas: (cost.gas - self.gas).max(0),
        }
    }

    /// Deduct `cost` unconditionally
    pub fn pay(&mut self, cost: &Cost) {
        self.minerals -= cost.minerals;
        self.gas -= cost.gas;
    }
}
