//! Curriculum - monotone difficulty schedule driven by smoothed success

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{CurriculumConfig, EnvConfig};
use crate::core::error::Result;

/// File each new setting is written to inside the log directory
pub const SETTING_FILE: &str = "curriculum_setting.json";

/// Inclusive range of instruction lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesRange {
    pub low: usize,
    pub high: usize,
}

impl LinesRange {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.low..=self.high.max(self.low))
    }
}

/// Generation parameters for one curriculum level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumSetting {
    pub max_build_tree_depth: usize,
    /// Ceiling for `n_lines_space.high`
    pub max_lines: usize,
    pub n_lines_space: LinesRange,
    pub level: u32,
}

impl CurriculumSetting {
    /// Level 0: shortest instructions, shallowest dependency chains
    pub fn initial(env: &EnvConfig, curriculum: &CurriculumConfig) -> Self {
        Self {
            max_build_tree_depth: curriculum.initial_build_tree_depth,
            max_lines: env.max_lines,
            n_lines_space: LinesRange::new(env.min_lines, env.min_lines),
            level: 0,
        }
    }

    /// Fixed setting used while evaluating
    pub fn evaluation(env: &EnvConfig) -> Self {
        Self {
            max_build_tree_depth: 100,
            max_lines: env.max_eval_lines,
            n_lines_space: LinesRange::new(env.min_eval_lines, env.max_eval_lines),
            level: 0,
        }
    }

    pub fn increment_max_lines(self) -> Self {
        Self {
            n_lines_space: LinesRange::new(
                self.n_lines_space.low,
                (self.n_lines_space.high + 1).min(self.max_lines),
            ),
            ..self
        }
    }

    pub fn increment_build_tree_depth(self) -> Self {
        Self {
            max_build_tree_depth: self.max_build_tree_depth + 1,
            ..self
        }
    }

    pub fn increment_level(self) -> Self {
        Self {
            level: self.level + 1,
            ..self
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Tracks smoothed success and advances the setting past a threshold
///
/// Advances alternate between longer instructions and deeper dependency
/// chains; once instructions hit `max_lines` only depth grows. The level
/// never exceeds `max_level`.
#[derive(Debug, Clone)]
pub struct Curriculum {
    setting: CurriculumSetting,
    mean_successes: f64,
    threshold: f64,
    smoothing: f64,
    max_level: u32,
    depth_next: bool,
    log_dir: Option<PathBuf>,
}

impl Curriculum {
    /// Start from a persisted setting or level 0, then fast-forward to
    /// `start_level`
    pub fn new(env: &EnvConfig, config: &CurriculumConfig) -> Result<Self> {
        let setting = match &config.setting_load_path {
            Some(path) => {
                let setting = CurriculumSetting::load(path)?;
                tracing::info!("Loaded curriculum setting {:?} from {}", setting, path.display());
                setting
            }
            None if env.evaluating => CurriculumSetting::evaluation(env),
            None => CurriculumSetting::initial(env, config),
        };
        let mut curriculum = Self {
            setting,
            mean_successes: 0.5,
            threshold: config.threshold,
            smoothing: config.smoothing,
            max_level: config.max_level,
            depth_next: false,
            log_dir: config.log_dir.clone(),
        };
        while curriculum.setting.level < config.start_level.min(config.max_level) {
            curriculum.setting = curriculum.next_setting();
        }
        tracing::info!("Starting at curriculum: {:?}", curriculum.setting);
        curriculum.persist()?;
        Ok(curriculum)
    }

    pub fn setting(&self) -> CurriculumSetting {
        self.setting
    }

    pub fn level(&self) -> u32 {
        self.setting.level
    }

    pub fn mean_successes(&self) -> f64 {
        self.mean_successes
    }

    fn next_setting(&mut self) -> CurriculumSetting {
        let setting = self.setting;
        if setting.level >= self.max_level {
            return setting;
        }
        let next = if !self.depth_next && setting.n_lines_space.high < setting.max_lines {
            self.depth_next = true;
            setting.increment_max_lines()
        } else {
            self.depth_next = false;
            setting.increment_build_tree_depth()
        };
        next.increment_level()
    }

    /// Fold in the successes of episodes completed since the last call
    ///
    /// Returns the new setting when the level advanced.
    pub fn record(&mut self, successes: &[bool]) -> Result<Option<CurriculumSetting>> {
        if successes.is_empty() {
            return Ok(None);
        }
        let batch = successes.iter().filter(|s| **s).count() as f64 / successes.len() as f64;
        self.mean_successes += self.smoothing * (batch - self.mean_successes);
        if self.mean_successes < self.threshold {
            return Ok(None);
        }

        self.mean_successes = 0.5;
        let next = self.next_setting();
        if next == self.setting {
            return Ok(None);
        }
        self.setting = next;
        tracing::info!(level = next.level, "Curriculum advanced to {:?}", next);
        self.persist()?;
        Ok(Some(next))
    }

    fn persist(&self) -> Result<()> {
        match &self.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                self.setting.save(&dir.join(SETTING_FILE))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> (EnvConfig, CurriculumConfig) {
        let env = EnvConfig {
            min_lines: 1,
            max_lines: 3,
            ..EnvConfig::default()
        };
        let curriculum = CurriculumConfig {
            threshold: 0.9,
            max_level: 6,
            smoothing: 1.0,
            ..CurriculumConfig::default()
        };
        (env, curriculum)
    }

    #[test]
    fn test_advances_alternate_then_depth_only() {
        let (env, config) = configs();
        let mut curriculum = Curriculum::new(&env, &config).unwrap();
        let mut history = vec![curriculum.setting()];
        for _ in 0..10 {
            if let Some(setting) = curriculum.record(&[true]).unwrap() {
                history.push(setting);
            }
        }
        let highs: Vec<usize> = history.iter().map(|s| s.n_lines_space.high).collect();
        let depths: Vec<usize> = history.iter().map(|s| s.max_build_tree_depth).collect();
        assert_eq!(highs, vec![1, 2, 2, 3, 3, 3, 3]);
        assert_eq!(depths, vec![1, 1, 2, 2, 3, 4, 5]);
        assert_eq!(curriculum.level(), 6);
    }

    #[test]
    fn test_level_monotone_and_capped() {
        let (env, config) = configs();
        let mut curriculum = Curriculum::new(&env, &config).unwrap();
        let mut level = curriculum.level();
        for i in 0..40 {
            curriculum.record(&[i % 3 != 0]).unwrap();
            assert!(curriculum.level() >= level);
            assert!(curriculum.level() <= 6);
            level = curriculum.level();
        }
    }

    #[test]
    fn test_mean_resets_after_advance() {
        let (env, config) = configs();
        let mut curriculum = Curriculum::new(&env, &config).unwrap();
        assert!(curriculum.record(&[true, true]).unwrap().is_some());
        assert_eq!(curriculum.mean_successes(), 0.5);
        assert!(curriculum.record(&[false]).unwrap().is_none());
        assert!(curriculum.record(&[]).unwrap().is_none());
    }

    #[test]
    fn test_setting_persisted_and_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let (env, mut config) = configs();
        config.log_dir = Some(dir.path().to_path_buf());
        config.start_level = 2;
        let curriculum = Curriculum::new(&env, &config).unwrap();
        assert_eq!(curriculum.level(), 2);

        config.setting_load_path = Some(dir.path().join(SETTING_FILE));
        config.start_level = 0;
        config.log_dir = None;
        let resumed = Curriculum::new(&env, &config).unwrap();
        assert_eq!(resumed.setting(), curriculum.setting());
    }
}
