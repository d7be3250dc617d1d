//! Subtask environment - upper/lower actions over the room-crossing world
//!
//! Shares failure replay and the tensor record contract with the
//! build-order environment. An upper action equal to the number of
//! subtasks is a no-op: the world does not advance and no time is spent.

use serde::{Deserialize, Serialize};

use crate::agent::observation::{ActionSpace, ObservationSpace, Tensor, TensorRecord};
use crate::core::config::SubtaskConfig;
use crate::core::error::{CraftError, Result};
use crate::episode::failure_buffer::FailureReplay;
use crate::episode::curriculum::LinesRange;
use crate::subtask::objects::{Item, LowerAction, Subtask, AGENT_CHANNEL, OBS_CHANNELS};
use crate::subtask::room::{block_lines, generate_blocks};
use crate::subtask::world::{Hazards, SubtaskWorld};

/// Hierarchical action: a subtask choice, a primitive move and pointer controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubtaskAction {
    pub upper: usize,
    pub lower: usize,
    pub delta: usize,
    pub dg: usize,
    pub ptr: usize,
}

impl SubtaskAction {
    pub const LEN: usize = 5;

    pub fn no_op() -> Self {
        Self {
            upper: Subtask::ALL.len(),
            ..Self::default()
        }
    }

    pub fn is_no_op(&self) -> bool {
        self.upper == Subtask::ALL.len()
    }

    /// Split a flat vector `[upper, lower, delta, dg, ptr]`
    pub fn parse(flat: &[usize]) -> Result<Self> {
        match *flat {
            [upper, lower, delta, dg, ptr] => Ok(Self {
                upper,
                lower,
                delta,
                dg,
                ptr,
            }),
            _ => Err(CraftError::ActionLength {
                expected: Self::LEN,
                got: flat.len(),
            }),
        }
    }

    pub fn flatten(&self) -> Vec<usize> {
        vec![self.upper, self.lower, self.delta, self.dg, self.ptr]
    }

    fn lower_action(&self) -> Result<LowerAction> {
        LowerAction::ALL
            .get(self.lower)
            .copied()
            .ok_or(CraftError::CodeOutOfRange {
                component: "lower action",
                code: self.lower,
                space: LowerAction::ALL.len(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskObservation {
    /// `[5]` item flags
    pub inventory: Tensor,
    /// `[L, 2]` line codes, `[0, 0]` on padding
    pub lines: Tensor,
    /// `[L]`, 1 on padding
    pub mask: Tensor,
    /// `[6, side, side]` materials, terrain, agent
    pub obs: Tensor,
}

impl SubtaskObservation {
    pub const FIELD_NAMES: [&'static str; 4] = ["inventory", "lines", "mask", "obs"];
}

impl TensorRecord for SubtaskObservation {
    fn fields(&self) -> Vec<(&'static str, &Tensor)> {
        let tensors = [&self.inventory, &self.lines, &self.mask, &self.obs];
        Self::FIELD_NAMES.into_iter().zip(tensors).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSummary {
    pub success: bool,
    pub instruction_len: usize,
    pub rooms_complete: usize,
    /// Fraction of rooms crossed
    pub progress: f64,
    pub len_failure_buffer: usize,
    pub use_failure_buf: bool,
    pub success_without_failure_buf: Option<f64>,
    pub reward_without_failure_buf: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskStep {
    pub observation: SubtaskObservation,
    pub reward: f32,
    pub done: bool,
    pub info: Option<SubtaskSummary>,
}

#[derive(Debug, Clone)]
struct Episode {
    rng: rand_chacha::ChaCha8Rng,
    world: SubtaskWorld,
    lines: Vec<Subtask>,
    time_remaining: usize,
    replayed: bool,
    finished: bool,
    total_reward: f32,
}

#[derive(Debug, Clone)]
pub struct SubtaskEnv {
    config: SubtaskConfig,
    replay: FailureReplay,
    episode: Option<Episode>,
}

impl SubtaskEnv {
    pub fn new(config: SubtaskConfig) -> Result<Self> {
        config.validate().map_err(CraftError::InvalidConfig)?;
        let replay = FailureReplay::new(&config.replay, config.seed, config.evaluating)?;
        Ok(Self {
            config,
            replay,
            episode: None,
        })
    }

    pub fn config(&self) -> &SubtaskConfig {
        &self.config
    }

    pub fn observation_space(&self) -> ObservationSpace {
        let lines = self.config.observed_lines();
        let side = self.config.room_side;
        let shapes = [
            vec![Item::ALL.len()],
            vec![lines, 2],
            vec![lines],
            vec![OBS_CHANNELS, side, side],
        ];
        ObservationSpace {
            fields: SubtaskObservation::FIELD_NAMES
                .iter()
                .map(|name| name.to_string())
                .zip(shapes)
                .collect(),
        }
    }

    /// `[#subtasks + 1, #lower, 2L, 2, L]`
    pub fn action_space(&self) -> ActionSpace {
        let lines = self.config.observed_lines();
        ActionSpace {
            nvec: vec![
                Subtask::ALL.len() + 1,
                LowerAction::ALL.len(),
                2 * lines,
                2,
                lines,
            ],
        }
    }

    pub fn failure_replay(&self) -> &FailureReplay {
        &self.replay
    }

    pub fn world(&self) -> Option<&SubtaskWorld> {
        self.episode.as_ref().map(|e| &e.world)
    }

    pub fn lines(&self) -> Option<&[Subtask]> {
        self.episode.as_ref().map(|e| e.lines.as_slice())
    }

    pub fn save_failure_buffer(&self, path: &std::path::Path) -> Result<()> {
        self.replay.save(path)
    }

    /// Ticks allowed per instruction line
    pub fn time_per_line(&self) -> usize {
        2 * (2 * self.config.room_side - 1)
    }

    pub fn reset(&mut self) -> SubtaskObservation {
        let seed = self.replay.begin();
        let mut rng = seed.rng;
        let config = &self.config;
        let range = if config.evaluating {
            LinesRange::new(config.min_eval_lines, config.max_eval_lines)
        } else {
            LinesRange::new(config.min_lines, config.max_lines)
        };
        let n_lines = range.sample(&mut rng);
        let blocks = generate_blocks(n_lines, config.room_side, &mut rng);
        let lines = block_lines(&blocks);
        let world = SubtaskWorld::generate(
            config.room_side,
            Hazards::from_config(config),
            blocks,
            &mut rng,
        );
        tracing::debug!(
            lines = lines.len(),
            rooms = world.num_rooms(),
            replayed = seed.replayed,
            "subtask episode generated"
        );

        let episode = Episode {
            rng,
            world,
            time_remaining: lines.len() * self.time_per_line(),
            lines,
            replayed: seed.replayed,
            finished: false,
            total_reward: 0.0,
        };
        let observation = self.observe(&episode);
        self.episode = Some(episode);
        observation
    }

    pub fn step(&mut self, action: &SubtaskAction) -> Result<SubtaskStep> {
        if action.upper > Subtask::ALL.len() {
            return Err(CraftError::CodeOutOfRange {
                component: "upper action",
                code: action.upper,
                space: Subtask::ALL.len() + 1,
            });
        }
        let lower = action.lower_action()?;
        let evaluating = self.config.evaluating;
        let mut episode = self.episode.take().ok_or(CraftError::EpisodeNotStarted)?;
        if episode.finished {
            self.episode = Some(episode);
            return Err(CraftError::EpisodeFinished);
        }

        if action.is_no_op() {
            let observation = self.observe(&episode);
            self.episode = Some(episode);
            return Ok(SubtaskStep {
                observation,
                reward: 0.0,
                done: false,
                info: None,
            });
        }

        episode.world.step(lower, &mut episode.rng);
        let mut done = episode.world.success();
        if !evaluating {
            episode.time_remaining = episode.time_remaining.saturating_sub(1);
            done |= episode.time_remaining == 0;
        }
        let reward = self.config.step_penalty;
        episode.total_reward += reward;

        let info = if done {
            episode.finished = true;
            Some(self.summarize(&episode))
        } else {
            None
        };
        let observation = self.observe(&episode);
        self.episode = Some(episode);
        Ok(SubtaskStep {
            observation,
            reward,
            done,
            info,
        })
    }

    fn summarize(&mut self, episode: &Episode) -> SubtaskSummary {
        let world = &episode.world;
        let success = world.success();
        self.replay.finish(success);
        let fresh = !episode.replayed;
        let summary = SubtaskSummary {
            success,
            instruction_len: episode.lines.len(),
            rooms_complete: world.rooms_complete(),
            progress: world.rooms_complete() as f64 / world.num_rooms().max(1) as f64,
            len_failure_buffer: self.replay.buffer().len(),
            use_failure_buf: episode.replayed,
            success_without_failure_buf: fresh.then_some(if success { 1.0 } else { 0.0 }),
            reward_without_failure_buf: fresh.then_some(episode.total_reward),
        };
        tracing::info!(
            success = summary.success,
            instruction_len = summary.instruction_len,
            rooms_complete = summary.rooms_complete,
            replayed = summary.use_failure_buf,
            "subtask episode finished"
        );
        summary
    }

    fn observe(&self, episode: &Episode) -> SubtaskObservation {
        let observed = self.config.observed_lines();
        let side = self.config.room_side;
        let world = &episode.world;

        let mut lines = Tensor::zeros(&[observed, 2]);
        let mut mask = Tensor::filled(&[observed], 1.0);
        for (index, line) in episode.lines.iter().take(observed).enumerate() {
            let [interaction, object] = line.line_code();
            lines.set(&[index, 0], interaction as f32);
            lines.set(&[index, 1], object as f32);
            mask.set(&[index], 0.0);
        }

        let mut obs = Tensor::zeros(&[OBS_CHANNELS, side, side]);
        for (coord, tile) in world.objects() {
            obs.set(&[tile.channel(), coord.i as usize, coord.j as usize], 1.0);
        }
        let agent = world.agent();
        obs.set(&[AGENT_CHANNEL, agent.i as usize, agent.j as usize], 1.0);

        let inventory = Tensor::from_vec(
            Item::ALL
                .iter()
                .map(|item| if world.inventory().contains(item) { 1.0 } else { 0.0 })
                .collect(),
        );

        SubtaskObservation {
            inventory,
            lines,
            mask,
            obs,
        }
    }
}
