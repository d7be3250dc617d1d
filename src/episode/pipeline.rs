//! Per-tick pipeline - state, observation, reward, done and info stages
//!
//! Each stage holds its own running state and exposes one `step`. The
//! environment calls them in fixed order once per tick; only the state
//! stage mutates the world, the rest read the same fully updated `State`.

use serde::{Deserialize, Serialize};

use crate::actions::component::{ActionComponent, ActionDims};
use crate::actions::compound::{BuildRules, CompoundAction, Invalid};
use crate::agent::observation::{Observation, RawAction, Tensor};
use crate::episode::task::{is_success, progress, Line};
use crate::world::objects::Resource;
use crate::world::state::{BuildingPositions, Positions, WorldState};
use crate::world::stockpile::Stockpile;
use crate::world::tick::{run_world_tick, TickEvent, TickRules};

/// Snapshot of one tick, rebuilt in place every step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub action: CompoundAction,
    pub pointer: usize,
    pub success: bool,
    pub time_remaining: usize,
    /// Whether the last submitted action was accepted
    pub valid: bool,
    pub rejection: Option<Invalid>,
    pub world: WorldState,
    pub events: Vec<TickEvent>,
}

impl State {
    pub fn building_positions(&self) -> &BuildingPositions {
        &self.world.buildings
    }

    pub fn pending_positions(&self) -> &BuildingPositions {
        &self.world.pending
    }

    pub fn positions(&self) -> &Positions {
        &self.world.positions
    }

    pub fn resources(&self) -> &Stockpile {
        &self.world.stockpile
    }
}

/// Decodes and validates actions, assigns workers and ticks the world
#[derive(Debug, Clone)]
pub struct StateStage {
    dims: ActionDims,
    rules: BuildRules,
    tick_rules: TickRules,
    lines: Vec<Line>,
    evaluating: bool,
    state: State,
}

impl StateStage {
    pub fn new(
        dims: ActionDims,
        rules: BuildRules,
        tick_rules: TickRules,
        lines: Vec<Line>,
        world: WorldState,
        time_budget: usize,
        evaluating: bool,
    ) -> Self {
        let success = is_success(&lines, &world);
        Self {
            dims,
            rules,
            tick_rules,
            lines,
            evaluating,
            state: State {
                action: CompoundAction::initial(),
                pointer: 0,
                success,
                time_remaining: time_budget,
                valid: true,
                rejection: None,
                world,
                events: Vec::new(),
            },
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn rules(&self) -> &BuildRules {
        &self.rules
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn step(&mut self, action: &RawAction) -> &State {
        let state = &mut self.state;
        state.pointer = action.ptr;

        let candidate = state.action.update_from_ints(&action.a, &self.dims);
        match candidate.invalid(&state.world, &self.rules) {
            Some(reason) => {
                tracing::debug!(stage = ?candidate.stage(), %reason, "action rejected");
                state.valid = false;
                state.rejection = Some(reason);
            }
            None => {
                if let Some(assignment) = candidate.assignment(&state.world.positions) {
                    for worker in candidate.workers() {
                        state.world.assign(*worker, assignment);
                    }
                }
                state.action = candidate;
                state.valid = true;
                state.rejection = None;
            }
        }

        state.events = run_world_tick(&mut state.world, &self.tick_rules);
        if !self.evaluating {
            state.time_remaining = state.time_remaining.saturating_sub(1);
        }
        state.success = is_success(&self.lines, &state.world);
        &self.state
    }
}

/// Renders world, instruction and action state into tensors
#[derive(Debug, Clone)]
pub struct ObsStage {
    dims: ActionDims,
    lines: Vec<Line>,
    observed_lines: usize,
}

impl ObsStage {
    pub fn new(dims: ActionDims, lines: Vec<Line>, observed_lines: usize) -> Self {
        Self {
            dims,
            lines,
            observed_lines,
        }
    }

    pub fn step(&self, state: &State) -> Observation {
        let dims = &self.dims;
        let n_lines = self.observed_lines;

        let mask = state.action.mask(dims);
        let mut action_mask = Tensor::zeros(&[dims.rows(), dims.row_width()]);
        for (r, row) in mask.iter().enumerate() {
            for (c, masked) in row.iter().enumerate() {
                if *masked {
                    action_mask.set(&[r, c], 1.0);
                }
            }
        }

        let mut gate_openers = Tensor::filled(&[dims.coord_space(), dims.rows()], -1.0);
        for (r, opener) in state.action.gate_openers(dims).iter().enumerate() {
            for (c, code) in opener.iter().enumerate() {
                gate_openers.set(&[r, c], *code as f32);
            }
        }

        let mut line_mask = Tensor::filled(&[n_lines], 1.0);
        let mut lines = Tensor::zeros(&[n_lines, 2]);
        for (i, line) in self.lines.iter().take(n_lines).enumerate() {
            line_mask.set(&[i], 0.0);
            lines.set(&[i, 0], 1.0 + f32::from(u8::from(line.required)));
            let code = dims.catalog.index_of(line.building).unwrap_or(0);
            lines.set(&[i, 1], 1.0 + code as f32);
        }

        let partial_action = Tensor::from_vec(
            state
                .action
                .to_ints(dims)
                .into_iter()
                .map(|x| x as f32)
                .collect(),
        );

        let stockpile = &state.world.stockpile;
        Observation {
            action_mask,
            gate_openers,
            line_mask,
            lines,
            obs: self.grid(&state.world),
            partial_action,
            ptr: Tensor::from_vec(vec![state.pointer as f32]),
            resources: Tensor::from_vec(vec![
                stockpile.get(Resource::Minerals) as f32,
                stockpile.get(Resource::Gas) as f32,
            ]),
        }
    }

    /// One-hot channels: buildings, pending, resources, workers
    fn grid(&self, world: &WorldState) -> Tensor {
        let dims = &self.dims;
        let side = dims.world_size.side();
        let buildings = dims.building_space();
        let mut grid = Tensor::zeros(&[buildings + 1 + 2 + dims.num_workers, side, side]);
        let mut mark = |channel: usize, coord: crate::core::types::Coord| {
            if dims.world_size.contains(coord) {
                grid.set(&[channel, coord.i as usize, coord.j as usize], 1.0);
            }
        };

        for (coord, building) in &world.buildings {
            if let Some(channel) = dims.catalog.index_of(*building) {
                mark(channel, *coord);
            }
        }
        for coord in world.pending.keys() {
            mark(buildings, *coord);
        }
        for resource in Resource::ALL {
            mark(buildings + 1 + resource.index(), world.positions.resource(resource));
        }
        for (worker, coord) in world.positions.workers() {
            mark(buildings + 3 + worker.to_int(dims), coord);
        }
        grid
    }
}

/// Constant per-tick reward
#[derive(Debug, Clone, Copy)]
pub struct RewardStage {
    step_penalty: f32,
}

impl RewardStage {
    pub fn new(step_penalty: f32) -> Self {
        Self { step_penalty }
    }

    pub fn step(&self, _state: &State) -> f32 {
        self.step_penalty
    }
}

/// Success, or an exhausted time budget outside evaluation
#[derive(Debug, Clone, Copy)]
pub struct DoneStage {
    evaluating: bool,
}

impl DoneStage {
    pub fn new(evaluating: bool) -> Self {
        Self { evaluating }
    }

    pub fn step(&self, state: &State) -> bool {
        state.success || (!self.evaluating && state.time_remaining == 0)
    }
}

/// What the info stage reports when an episode ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub success: bool,
    pub instruction_len: usize,
    pub progress: f64,
}

/// Emits an outcome only on the terminal tick
#[derive(Debug, Clone)]
pub struct InfoStage {
    lines: Vec<Line>,
}

impl InfoStage {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    pub fn step(&self, state: &State, done: bool) -> Option<EpisodeOutcome> {
        done.then(|| EpisodeOutcome {
            success: state.success,
            instruction_len: self.lines.len(),
            progress: progress(&self.lines, &state.world),
        })
    }
}
