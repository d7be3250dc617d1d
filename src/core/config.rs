//! Environment configuration with documented constants
//!
//! Every knob the environments read lives here. Configs deserialize from
//! TOML with per-field defaults, so a file only needs the values it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{CraftError, Result};
use crate::core::types::{Movement, WorldSize};

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub env: EnvConfig,
    pub subtask: SubtaskConfig,
    pub curriculum: CurriculumConfig,
}

impl Config {
    /// Load and validate a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate().map_err(CraftError::InvalidConfig)?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.env.validate()?;
        self.subtask.validate()?;
        self.curriculum.validate()
    }
}

/// Failure-replay settings shared by both environments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Capacity of the failure buffer; the oldest entry is evicted when full
    pub failure_buffer_size: usize,

    /// Success rate the replay schedule aims for
    ///
    /// Replay probability is `max(0, 1 - target / success_avg)`, so replay
    /// only kicks in once the running success average exceeds the target.
    pub target_success_rate: f64,

    /// EMA coefficient for the running success average
    pub success_smoothing: f64,

    /// Optional failure buffer saved by an earlier run
    pub failure_buffer_load_path: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            failure_buffer_size: 500,
            target_success_rate: 0.8,
            success_smoothing: 0.05,
            failure_buffer_load_path: None,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.target_success_rate) {
            return Err(format!(
                "target_success_rate ({}) must be within [0, 1]",
                self.target_success_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.success_smoothing) {
            return Err(format!(
                "success_smoothing ({}) must be within [0, 1]",
                self.success_smoothing
            ));
        }
        Ok(())
    }
}

/// Build-order environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    // === WORLD ===
    /// Side of the square world; sizes every coordinate encoding
    pub world_size: WorldSize,

    /// Number of controllable workers (`W1..Wn`)
    pub num_workers: usize,

    /// Whether the Assimilator is part of the building catalog
    ///
    /// Without it gas can never be harvested, so generated tasks only
    /// require mineral-only buildings.
    pub include_assimilator: bool,

    /// Units banked per completed harvest trip
    pub harvest_yield: i64,

    /// Reject building selections the stockpile cannot pay for
    ///
    /// When false the cost is still deducted at commitment and the
    /// stockpile may go negative.
    pub enforce_costs: bool,

    /// Worker stepping rule
    pub movement: Movement,

    /// Stockpile at episode start
    pub initial_minerals: i64,
    pub initial_gas: i64,

    // === EPISODE ===
    /// Reward added every tick
    pub step_penalty: f32,

    /// Tick budget per instruction line (training only)
    pub time_per_line: usize,

    /// Instruction length bounds for training and evaluation
    pub min_lines: usize,
    pub max_lines: usize,
    pub min_eval_lines: usize,
    pub max_eval_lines: usize,

    /// Evaluation disables the tick budget and failure replay
    pub evaluating: bool,

    /// Base seed; vectorized instances add their rank
    pub seed: u64,

    pub replay: ReplayConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            world_size: WorldSize(6),
            num_workers: 12,
            include_assimilator: true,
            harvest_yield: 5,
            enforce_costs: true,
            movement: Movement::Diagonal,
            initial_minerals: 0,
            initial_gas: 0,
            step_penalty: -0.1,
            time_per_line: 200,
            min_lines: 1,
            max_lines: 10,
            min_eval_lines: 1,
            max_eval_lines: 50,
            evaluating: false,
            seed: 0,
            replay: ReplayConfig::default(),
        }
    }
}

impl EnvConfig {
    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        // Minerals, gas and the starting Nexus need distinct tiles
        if self.world_size.cells() < 3 {
            return Err(format!(
                "world_size ({}) leaves fewer than 3 tiles",
                self.world_size.side()
            ));
        }
        if self.num_workers == 0 {
            return Err("num_workers must be positive".into());
        }
        if self.harvest_yield <= 0 {
            return Err(format!(
                "harvest_yield ({}) must be positive",
                self.harvest_yield
            ));
        }
        if self.min_lines == 0 || self.min_lines > self.max_lines {
            return Err(format!(
                "line bounds must satisfy 1 <= min_lines ({}) <= max_lines ({})",
                self.min_lines, self.max_lines
            ));
        }
        if self.min_eval_lines == 0 || self.min_eval_lines > self.max_eval_lines {
            return Err(format!(
                "eval line bounds must satisfy 1 <= min_eval_lines ({}) <= max_eval_lines ({})",
                self.min_eval_lines, self.max_eval_lines
            ));
        }
        self.replay.validate()
    }

    /// Width of the instruction observation
    pub fn observed_lines(&self) -> usize {
        if self.evaluating {
            self.max_eval_lines
        } else {
            self.max_lines
        }
    }
}

/// Subtask (room-crossing) environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtaskConfig {
    /// Rooms are `room_side x room_side`; the last column is the crossing
    pub room_side: usize,

    pub min_lines: usize,
    pub max_lines: usize,
    pub min_eval_lines: usize,
    pub max_eval_lines: usize,

    /// Chance per tick that one build supply is stolen
    pub bandit_prob: f64,

    /// Chance that a paid-for bridge washes out before the agent crosses
    pub bridge_failure_prob: f64,

    /// Chance that collecting a material also yields a mountain map
    pub map_discovery_prob: f64,

    pub step_penalty: f32,
    pub evaluating: bool,
    pub seed: u64,
    pub replay: ReplayConfig,
}

impl Default for SubtaskConfig {
    fn default() -> Self {
        Self {
            room_side: 4,
            min_lines: 1,
            max_lines: 10,
            min_eval_lines: 1,
            max_eval_lines: 50,
            bandit_prob: 0.0,
            bridge_failure_prob: 0.0,
            map_discovery_prob: 0.0,
            step_penalty: -0.1,
            evaluating: false,
            seed: 0,
            replay: ReplayConfig::default(),
        }
    }
}

impl SubtaskConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        // Blocks are drawn below room_size - side - 1, which must be positive
        if self.room_side < 3 {
            return Err(format!("room_side ({}) must be at least 3", self.room_side));
        }
        if self.min_lines == 0 || self.min_lines > self.max_lines {
            return Err(format!(
                "line bounds must satisfy 1 <= min_lines ({}) <= max_lines ({})",
                self.min_lines, self.max_lines
            ));
        }
        if self.min_eval_lines == 0 || self.min_eval_lines > self.max_eval_lines {
            return Err(format!(
                "eval line bounds must satisfy 1 <= min_eval_lines ({}) <= max_eval_lines ({})",
                self.min_eval_lines, self.max_eval_lines
            ));
        }
        for (name, p) in [
            ("bandit_prob", self.bandit_prob),
            ("bridge_failure_prob", self.bridge_failure_prob),
            ("map_discovery_prob", self.map_discovery_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} ({p}) must be within [0, 1]"));
            }
        }
        self.replay.validate()
    }

    pub fn observed_lines(&self) -> usize {
        // +1 leaves room for the trailing crossing line
        1 + if self.evaluating {
            self.max_eval_lines
        } else {
            self.max_lines
        }
    }
}

/// Curriculum progression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumConfig {
    /// Smoothed success rate that triggers the next level
    pub threshold: f64,

    /// Highest reachable level
    pub max_level: u32,

    /// EMA coefficient for the smoothed success rate
    pub smoothing: f64,

    /// Dependency chain length at level 0
    pub initial_build_tree_depth: usize,

    /// Level to fast-forward to at startup
    pub start_level: u32,

    /// Resume from a persisted setting instead of level 0
    pub setting_load_path: Option<PathBuf>,

    /// Where each new setting is persisted
    pub log_dir: Option<PathBuf>,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            max_level: 10,
            smoothing: 0.1,
            initial_build_tree_depth: 1,
            start_level: 0,
            setting_load_path: None,
            log_dir: None,
        }
    }
}

impl CurriculumConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!("threshold ({}) must be within [0, 1]", self.threshold));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(format!("smoothing ({}) must be within [0, 1]", self.smoothing));
        }
        if self.initial_build_tree_depth == 0 {
            return Err("initial_build_tree_depth must be positive".into());
        }
        if self.start_level > self.max_level {
            return Err(format!(
                "start_level ({}) exceeds max_level ({})",
                self.start_level, self.max_level
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::parse_toml(
            r#"
            [env]
            world_size = 4
            num_workers = 1

            [env.replay]
            failure_buffer_size = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.env.world_size.side(), 4);
        assert_eq!(config.env.num_workers, 1);
        assert_eq!(config.env.replay.failure_buffer_size, 3);
        assert_eq!(config.env.harvest_yield, 5);
        assert_eq!(config.subtask.room_side, 4);
    }

    #[test]
    fn test_movement_parses_snake_case() {
        let config = Config::parse_toml("[env]\nmovement = \"axis_aligned\"\n").unwrap();
        assert_eq!(config.env.movement, Movement::AxisAligned);
    }

    #[test]
    fn test_invalid_line_bounds_rejected() {
        let err = Config::parse_toml("[env]\nmin_lines = 5\nmax_lines = 2\n").unwrap_err();
        assert!(matches!(err, CraftError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_world_size_rejected() {
        assert!(Config::parse_toml("[env]\nworld_size = 0\n").is_err());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::parse_toml(include_str!("../../data/default.toml")).unwrap();
        assert!(config.validate().is_ok());
    }
}
