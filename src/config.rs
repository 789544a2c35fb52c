//! Simulation, learner and driver settings.
//!
//! Every field has a default taken from `global_variables`, so a JSON config file only
//! needs to name the values it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent::q_learner::LearnerConfig;
use crate::control_system::reward::RewardWeights;
use crate::error::{ConfigError, SimError};
use crate::global_variables::{
    ARRIVAL_PROBABILITY, DEFAULT_SEED, INITIAL_QUEUE_MAX, INITIAL_QUEUE_MIN, MAX_GREEN_TICKS,
    MAX_QUEUE_LENGTH, MIN_GREEN_TICKS, MIN_RELEASE_INTERVAL_SECS, STATE_CEILING, TICK_SECONDS,
};
use crate::simulation_engine::intersections::IntersectionGeometry;
use crate::simulation_engine::vehicles::Kinematics;
use crate::training::TrainingConfig;

/// Settings for the intersection simulator and its phase controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub geometry: IntersectionGeometry,
    pub kinematics: Kinematics,
    /// Simulated seconds per physics tick.
    pub tick_seconds: f64,
    /// Ticks a phase must run before a switch request is honoured.
    pub min_green_ticks: u32,
    /// Ticks after which the longest queue is given green regardless of the request.
    pub max_green_ticks: u32,
    /// Global minimum gap between two releases, in simulated seconds.
    pub min_release_interval_secs: f64,
    /// Per-lane, per-step probability of a new arrival.
    pub arrival_probability: f64,
    /// Range of waiting vehicles placed on each lane by `reset`.
    pub initial_queue_min: usize,
    pub initial_queue_max: usize,
    pub max_queue_length: usize,
    /// Ceiling applied to each queue length in the discretized state.
    pub state_ceiling: usize,
    pub reward: RewardWeights,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            geometry: IntersectionGeometry::default(),
            kinematics: Kinematics::default(),
            tick_seconds: TICK_SECONDS,
            min_green_ticks: MIN_GREEN_TICKS,
            max_green_ticks: MAX_GREEN_TICKS,
            min_release_interval_secs: MIN_RELEASE_INTERVAL_SECS,
            arrival_probability: ARRIVAL_PROBABILITY,
            initial_queue_min: INITIAL_QUEUE_MIN,
            initial_queue_max: INITIAL_QUEUE_MAX,
            max_queue_length: MAX_QUEUE_LENGTH,
            state_ceiling: STATE_CEILING,
            reward: RewardWeights::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl SimConfig {
    /// Rejects settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: &str| {
            Err(SimError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if !(self.tick_seconds > 0.0) {
            return invalid("tick_seconds must be positive");
        }
        if self.min_green_ticks > self.max_green_ticks {
            return invalid("min_green_ticks must not exceed max_green_ticks");
        }
        if !(0.0..=1.0).contains(&self.arrival_probability) {
            return invalid("arrival_probability must be within [0, 1]");
        }
        if self.initial_queue_min > self.initial_queue_max {
            return invalid("initial_queue_min must not exceed initial_queue_max");
        }
        if self.max_queue_length == 0 {
            return invalid("max_queue_length must be at least 1");
        }
        if !(self.kinematics.release_max_speed > 0.0 && self.kinematics.release_acceleration > 0.0)
        {
            return invalid("released vehicles need a positive speed cap and acceleration");
        }
        if !(self.kinematics.max_speed > 0.0 && self.kinematics.acceleration > 0.0) {
            return invalid("approaching vehicles need a positive speed cap and acceleration");
        }
        if self.min_release_interval_secs < 0.0 {
            return invalid("min_release_interval_secs must not be negative");
        }
        self.reward.validate()
    }
}

/// Everything the training driver needs, as read from one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimConfig,
    pub learner: LearnerConfig,
    pub training: TrainingConfig,
}

impl AppConfig {
    /// Reads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.simulation.validate()?;
        self.learner.validate()?;
        self.training.validate()
    }
}
