//! Policy contract - what a network must produce each step

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::observation::{Observation, RawAction};

/// One step of policy output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutput<H> {
    pub action: RawAction,
    /// Value estimate for the observation
    pub value: f32,
    pub hidden: H,
}

/// A policy maps an observation and recurrent state to an action
///
/// Recurrent networks carry a [`RecurrentState`] of tensors as `Hidden`.
pub trait Policy {
    type Hidden;

    fn initial_hidden(&self) -> Self::Hidden;

    fn act(&mut self, observation: &Observation, hidden: &Self::Hidden)
        -> PolicyOutput<Self::Hidden>;
}

/// Recurrent outputs a network reports alongside its action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurrentState<X> {
    pub a: X,
    pub d: X,
    pub h: X,
    pub dg: X,
    pub p: X,
    pub v: X,
    pub a_probs: X,
    pub d_probs: X,
    pub dg_probs: X,
}

impl<X> RecurrentState<X> {
    pub const FIELD_NAMES: [&'static str; 9] =
        ["a", "d", "h", "dg", "p", "v", "a_probs", "d_probs", "dg_probs"];

    pub fn map<Y>(self, mut f: impl FnMut(X) -> Y) -> RecurrentState<Y> {
        RecurrentState {
            a: f(self.a),
            d: f(self.d),
            h: f(self.h),
            dg: f(self.dg),
            p: f(self.p),
            v: f(self.v),
            a_probs: f(self.a_probs),
            d_probs: f(self.d_probs),
            dg_probs: f(self.dg_probs),
        }
    }
}

/// Samples uniformly among unmasked codes
///
/// Never emits a masked code, so every action it takes passes the mask.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    type Hidden = ();

    fn initial_hidden(&self) {}

    fn act(&mut self, observation: &Observation, _hidden: &()) -> PolicyOutput<()> {
        let a = observation
            .action_mask
            .rows()
            .map(|row| {
                let unmasked: Vec<usize> = (0..row.len()).filter(|i| row[*i] == 0.0).collect();
                unmasked.choose(&mut self.rng).copied().unwrap_or(0)
            })
            .collect();
        let lines = observation.line_mask.len().max(1);
        PolicyOutput {
            action: RawAction {
                delta: self.rng.gen_range(0..2 * lines),
                dg: self.rng.gen_range(0..2),
                ptr: self.rng.gen_range(0..lines),
                a,
            },
            value: 0.0,
            hidden: (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recurrent_state_map() {
        let state = RecurrentState {
            a: 1,
            d: 2,
            h: 3,
            dg: 4,
            p: 5,
            v: 6,
            a_probs: 7,
            d_probs: 8,
            dg_probs: 9,
        };
        let doubled = state.map(|x| x * 2);
        assert_eq!(doubled.dg_probs, 18);
        assert_eq!(RecurrentState::<()>::FIELD_NAMES.len(), 9);
    }
}
