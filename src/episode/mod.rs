//! Episode driver: task generation, stage pipeline, failure replay and
//! curriculum

pub mod curriculum;
pub mod env;
pub mod failure_buffer;
pub mod pipeline;
pub mod task;
pub mod vec_env;

pub use curriculum::{Curriculum, CurriculumSetting, LinesRange};
pub use env::{Env, EpisodeSummary, StepResult};
pub use failure_buffer::{replay_probability, EpisodeSeed, FailureBuffer, FailureReplay};
pub use pipeline::{DoneStage, EpisodeOutcome, InfoStage, ObsStage, RewardStage, State, StateStage};
pub use task::Line;
pub use vec_env::VecEnv;
