//! Error types for the simulator, the learner's model file and the training driver.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the simulation control loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The requested green lane is not one of the four approaches.
    #[error("Invalid action {action}: expected a lane index in 0..{lanes}")]
    InvalidAction { action: usize, lanes: usize },

    /// Configuration values that cannot drive a simulation.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Errors raised while saving or loading the learner's value table.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file {path:?} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold a value table.
    #[error("Model file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record decoded fine but names an action outside the action set.
    #[error("Model file {path:?} has an entry with invalid action {action}")]
    InvalidEntry { path: PathBuf, action: usize },

    #[error("Value table could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors raised while loading a JSON configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {path:?} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path:?} could not be parsed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// Errors surfaced by the training driver.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Episode log could not be written: {0}")]
    EpisodeLog(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
