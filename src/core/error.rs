use thiserror::Error;

#[derive(Error, Debug)]
pub enum CraftError {
    #[error("{component} code {code} outside space of size {space}")]
    CodeOutOfRange {
        component: &'static str,
        code: usize,
        space: usize,
    },

    #[error("Action vector has {got} entries, expected {expected}")]
    ActionLength { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Episode has not been reset")]
    EpisodeNotStarted,

    #[error("Episode already finished, call reset")]
    EpisodeFinished,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CraftError>;
