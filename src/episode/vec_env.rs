//! Vectorized environments stepped in parallel with rayon
//!
//! Instances share nothing: each owns its PRNG stream
//! (`seed.wrapping_add(rank)`) and failure buffer. Finished episodes reset
//! automatically, and curriculum advances are broadcast between batches.

use std::path::Path;

use rayon::prelude::*;

use crate::agent::observation::{Observation, RawAction};
use crate::core::config::Config;
use crate::core::error::{CraftError, Result};
use crate::episode::curriculum::{Curriculum, CurriculumSetting};
use crate::episode::env::{Env, StepResult};

pub struct VecEnv {
    envs: Vec<Env>,
    curriculum: Curriculum,
    evaluating: bool,
}

impl VecEnv {
    pub fn new(config: &Config, num_envs: usize) -> Result<Self> {
        config.validate().map_err(CraftError::InvalidConfig)?;
        let curriculum = Curriculum::new(&config.env, &config.curriculum)?;
        let envs = (0..num_envs)
            .map(|rank| {
                let mut env_config = config.env.clone();
                env_config.seed = config.env.seed.wrapping_add(rank as u64);
                let mut env = Env::new(env_config, &config.curriculum)?;
                env.set_curriculum(curriculum.setting());
                Ok(env)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            envs,
            curriculum,
            evaluating: config.env.evaluating,
        })
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn envs(&self) -> &[Env] {
        &self.envs
    }

    pub fn curriculum_setting(&self) -> CurriculumSetting {
        self.curriculum.setting()
    }

    pub fn reset(&mut self) -> Vec<Observation> {
        self.envs.par_iter_mut().map(Env::reset).collect()
    }

    /// Step every instance with its action
    ///
    /// A finished instance is reset and its result carries the first
    /// observation of the next episode.
    pub fn step(&mut self, actions: &[RawAction]) -> Result<Vec<StepResult>> {
        if actions.len() != self.envs.len() {
            return Err(CraftError::ActionLength {
                expected: self.envs.len(),
                got: actions.len(),
            });
        }
        let results = self
            .envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, action)| {
                let mut result = env.step(action)?;
                if result.done {
                    result.observation = env.reset();
                }
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        if !self.evaluating {
            let successes: Vec<bool> = results
                .iter()
                .filter_map(|r| r.info.as_ref().map(|info| info.success))
                .collect();
            if let Some(setting) = self.curriculum.record(&successes)? {
                self.set_curriculum(setting);
            }
        }
        Ok(results)
    }

    pub fn set_curriculum(&mut self, setting: CurriculumSetting) {
        for env in &mut self.envs {
            env.set_curriculum(setting);
        }
    }

    /// Write each instance's buffer to `<dir>/failure_buffer_<rank>.json`
    pub fn save_failure_buffers(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for (rank, env) in self.envs.iter().enumerate() {
            env.save_failure_buffer(&dir.join(format!("failure_buffer_{rank}.json")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WorldSize;

    fn config() -> Config {
        let mut config = Config::default();
        config.env.world_size = WorldSize::new(4).unwrap();
        config.env.num_workers = 2;
        config.env.time_per_line = 2;
        config
    }

    #[test]
    fn test_instances_use_distinct_streams() {
        let mut envs = VecEnv::new(&config(), 4).unwrap();
        let observations = envs.reset();
        assert_eq!(observations.len(), 4);
        let positions: Vec<_> = envs
            .envs()
            .iter()
            .map(|e| e.state().unwrap().positions().clone())
            .collect();
        assert!(positions.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_seed_offsets_wrap_at_max() {
        let mut config = config();
        config.env.seed = u64::MAX;
        let envs = VecEnv::new(&config, 3).unwrap();
        let seeds: Vec<u64> = envs.envs().iter().map(|e| e.config().seed).collect();
        assert_eq!(seeds, vec![u64::MAX, 0, 1]);
    }

    #[test]
    fn test_curriculum_depth_reaches_every_instance() {
        let mut config = config();
        config.curriculum.initial_build_tree_depth = 3;
        let envs = VecEnv::new(&config, 2).unwrap();
        assert!(envs
            .envs()
            .iter()
            .all(|e| e.curriculum_setting().max_build_tree_depth == 3));
    }

    #[test]
    fn test_auto_reset_keeps_stepping() {
        let mut envs = VecEnv::new(&config(), 2).unwrap();
        envs.reset();
        let rows = envs.envs()[0].dims().rows();
        let actions = vec![
            RawAction {
                a: vec![1; rows],
                ..RawAction::default()
            };
            2
        ];
        let mut finished = 0;
        for _ in 0..20 {
            let results = envs.step(&actions).unwrap();
            finished += results.iter().filter(|r| r.done).count();
        }
        assert!(finished >= 2);
    }

    #[test]
    fn test_action_count_checked() {
        let mut envs = VecEnv::new(&config(), 2).unwrap();
        envs.reset();
        assert!(matches!(
            envs.step(&[]),
            Err(CraftError::ActionLength { expected: 2, got: 0 })
        ));
    }
}
