//! Build-order environment - reset/step over the stage pipeline

use serde::{Deserialize, Serialize};

use crate::actions::component::ActionDims;
use crate::actions::compound::BuildRules;
use crate::agent::observation::{ActionSpace, Observation, ObservationSpace, RawAction};
use crate::core::config::{CurriculumConfig, EnvConfig};
use crate::core::error::{CraftError, Result};
use crate::episode::curriculum::CurriculumSetting;
use crate::episode::failure_buffer::FailureReplay;
use crate::episode::pipeline::{DoneStage, InfoStage, ObsStage, RewardStage, State, StateStage};
use crate::episode::task::{generate_dependencies, generate_lines, generate_world, Line};
use crate::world::stockpile::Stockpile;
use crate::world::tick::TickRules;

/// Summary emitted on the terminal step of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub success: bool,
    pub instruction_len: usize,
    /// Fraction of required lines covered
    pub progress: f64,
    pub len_failure_buffer: usize,
    pub use_failure_buf: bool,
    /// Only set for fresh episodes
    pub success_without_failure_buf: Option<f64>,
    /// Episode return, only set for fresh episodes
    pub reward_without_failure_buf: Option<f32>,
    pub curriculum_level: u32,
}

/// Result of one environment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    /// Present only when `done`
    pub info: Option<EpisodeSummary>,
}

#[derive(Debug, Clone)]
struct Episode {
    state: StateStage,
    obs: ObsStage,
    reward: RewardStage,
    done: DoneStage,
    info: InfoStage,
    replayed: bool,
    finished: bool,
    total_reward: f32,
}

/// One build-order environment instance with its own PRNG and failure buffer
#[derive(Debug, Clone)]
pub struct Env {
    config: EnvConfig,
    dims: ActionDims,
    replay: FailureReplay,
    setting: CurriculumSetting,
    episode: Option<Episode>,
}

impl Env {
    /// `curriculum` sets the level-0 task setting used outside evaluation
    pub fn new(config: EnvConfig, curriculum: &CurriculumConfig) -> Result<Self> {
        config.validate().map_err(CraftError::InvalidConfig)?;
        curriculum.validate().map_err(CraftError::InvalidConfig)?;
        let replay = FailureReplay::new(&config.replay, config.seed, config.evaluating)?;
        let setting = if config.evaluating {
            CurriculumSetting::evaluation(&config)
        } else {
            CurriculumSetting::initial(&config, curriculum)
        };
        Ok(Self {
            dims: ActionDims::from_config(&config),
            config,
            replay,
            setting,
            episode: None,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn dims(&self) -> &ActionDims {
        &self.dims
    }

    pub fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::build_order(&self.dims, self.config.observed_lines())
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::build_order(&self.dims, self.config.observed_lines())
    }

    pub fn curriculum_setting(&self) -> CurriculumSetting {
        self.setting
    }

    /// Applies from the next reset on
    pub fn set_curriculum(&mut self, setting: CurriculumSetting) {
        self.setting = setting;
    }

    pub fn failure_replay(&self) -> &FailureReplay {
        &self.replay
    }

    /// Current tick state, `None` before the first reset
    pub fn state(&self) -> Option<&State> {
        self.episode.as_ref().map(|e| e.state.state())
    }

    pub fn lines(&self) -> Option<&[Line]> {
        self.episode.as_ref().map(|e| e.state.lines())
    }

    pub fn save_failure_buffer(&self, path: &std::path::Path) -> Result<()> {
        self.replay.save(path)
    }

    /// Start a new episode, fresh or replayed
    pub fn reset(&mut self) -> Observation {
        let seed = self.replay.begin();
        let mut rng = seed.rng;
        let config = &self.config;
        let catalog = &self.dims.catalog;

        let n_lines = self.setting.n_lines_space.sample(&mut rng);
        let dependencies =
            generate_dependencies(catalog, self.setting.max_build_tree_depth, &mut rng);
        let lines = generate_lines(n_lines, &catalog.buildable(), &dependencies, &mut rng);
        let world = generate_world(
            config.world_size,
            config.num_workers,
            Stockpile::new(config.initial_minerals, config.initial_gas),
            &mut rng,
        );
        tracing::debug!(
            lines = lines.len(),
            replayed = seed.replayed,
            "episode generated"
        );

        let state = StateStage::new(
            self.dims.clone(),
            BuildRules {
                dependencies,
                enforce_costs: config.enforce_costs,
            },
            TickRules {
                harvest_yield: config.harvest_yield,
                movement: config.movement,
            },
            lines.clone(),
            world,
            lines.len() * config.time_per_line,
            config.evaluating,
        );
        let obs = ObsStage::new(self.dims.clone(), lines.clone(), config.observed_lines());
        let observation = obs.step(state.state());
        self.episode = Some(Episode {
            state,
            obs,
            reward: RewardStage::new(config.step_penalty),
            done: DoneStage::new(config.evaluating),
            info: InfoStage::new(lines),
            replayed: seed.replayed,
            finished: false,
            total_reward: 0.0,
        });
        observation
    }

    /// Advance one tick
    ///
    /// Rejected actions are not errors: the tick still runs and
    /// `State::valid` is cleared.
    pub fn step(&mut self, action: &RawAction) -> Result<StepResult> {
        let episode = self.episode.as_mut().ok_or(CraftError::EpisodeNotStarted)?;
        if episode.finished {
            return Err(CraftError::EpisodeFinished);
        }
        if action.a.len() != self.dims.rows() {
            return Err(CraftError::ActionLength {
                expected: self.dims.rows(),
                got: action.a.len(),
            });
        }

        let state = episode.state.step(action);
        let observation = episode.obs.step(state);
        let reward = episode.reward.step(state);
        let done = episode.done.step(state);
        let outcome = episode.info.step(state, done);
        episode.total_reward += reward;

        let info = match outcome {
            Some(outcome) => {
                episode.finished = true;
                self.replay.finish(outcome.success);
                let fresh = !episode.replayed;
                let summary = EpisodeSummary {
                    success: outcome.success,
                    instruction_len: outcome.instruction_len,
                    progress: outcome.progress,
                    len_failure_buffer: self.replay.buffer().len(),
                    use_failure_buf: episode.replayed,
                    success_without_failure_buf: fresh
                        .then_some(if outcome.success { 1.0 } else { 0.0 }),
                    reward_without_failure_buf: fresh.then_some(episode.total_reward),
                    curriculum_level: self.setting.level,
                };
                tracing::info!(
                    success = summary.success,
                    instruction_len = summary.instruction_len,
                    progress = summary.progress,
                    replayed = summary.use_failure_buf,
                    "episode finished"
                );
                Some(summary)
            }
            None => None,
        };

        Ok(StepResult {
            observation,
            reward,
            done,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::observation::TensorRecord;
    use crate::core::types::WorldSize;

    fn config() -> EnvConfig {
        EnvConfig {
            world_size: WorldSize::new(4).unwrap(),
            num_workers: 2,
            time_per_line: 3,
            max_lines: 4,
            ..EnvConfig::default()
        }
    }

    fn noop(env: &Env) -> RawAction {
        RawAction {
            a: vec![1; env.dims().rows()],
            ..RawAction::default()
        }
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = Env::new(config(), &CurriculumConfig::default()).unwrap();
        let action = noop(&env);
        assert!(matches!(env.step(&action), Err(CraftError::EpisodeNotStarted)));
    }

    #[test]
    fn test_wrong_action_length_fails() {
        let mut env = Env::new(config(), &CurriculumConfig::default()).unwrap();
        env.reset();
        let action = RawAction {
            a: vec![0],
            ..RawAction::default()
        };
        assert!(matches!(env.step(&action), Err(CraftError::ActionLength { .. })));
    }

    #[test]
    fn test_time_budget_ends_episode_with_summary() {
        let mut env = Env::new(config(), &CurriculumConfig::default()).unwrap();
        let observation = env.reset();
        assert_eq!(observation.flatten().len(), env.observation_space().flat_width());
        let budget = env.lines().unwrap().len() * 3;
        let action = noop(&env);
        let mut tick = 0;
        let info = loop {
            tick += 1;
            let result = env.step(&action).unwrap();
            assert!((result.reward + 0.1).abs() < 1e-6);
            assert_eq!(result.info.is_some(), result.done);
            if let Some(info) = result.info {
                break info;
            }
            assert!(tick < budget);
        };
        assert!(!info.use_failure_buf);
        if info.success {
            // Only an instruction already covered by the starting Nexus
            assert_eq!(tick, 1);
        } else {
            assert_eq!(tick, budget);
            assert_eq!(info.success_without_failure_buf, Some(0.0));
            assert_eq!(info.len_failure_buffer, 1);
        }
        assert!(matches!(env.step(&action), Err(CraftError::EpisodeFinished)));
    }

    #[test]
    fn test_same_seed_same_episode() {
        let mut a = Env::new(config(), &CurriculumConfig::default()).unwrap();
        let mut b = Env::new(config(), &CurriculumConfig::default()).unwrap();
        assert_eq!(a.reset(), b.reset());
        assert_eq!(a.lines(), b.lines());
    }
}
