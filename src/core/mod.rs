pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, CurriculumConfig, EnvConfig, ReplayConfig, SubtaskConfig};
pub use error::{CraftError, Result};
pub use types::{get_nearest, move_from, Coord, Movement, WorldSize};
