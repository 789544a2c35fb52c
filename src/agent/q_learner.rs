//! Tabular Q-learning over discretized queue states.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, SimError};
use crate::global_variables::{
    DEFAULT_SEED, DISCOUNT_FACTOR, EXPLORATION_RATE, INCUMBENT_BIAS, LEARNING_RATE, NUM_LANES,
};
use crate::state::TrafficState;

/// Learning hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Step size alpha.
    pub learning_rate: f64,
    /// Discount gamma.
    pub discount_factor: f64,
    /// Initial epsilon.
    pub exploration_rate: f64,
    /// Added to the current green's value when exploiting, so ties keep the phase.
    pub incumbent_bias: f64,
    pub seed: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            discount_factor: DISCOUNT_FACTOR,
            exploration_rate: EXPLORATION_RATE,
            incumbent_bias: INCUMBENT_BIAS,
            seed: DEFAULT_SEED,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: &str| {
            Err(SimError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid("learning_rate must be within (0, 1]");
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return invalid("discount_factor must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return invalid("exploration_rate must be within [0, 1]");
        }
        if self.incumbent_bias < 0.0 {
            return invalid("incumbent_bias must not be negative");
        }
        Ok(())
    }
}

/// Key of the value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateAction {
    pub state: TrafficState,
    pub action: usize,
}

/// One persisted table record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QEntry {
    pub state: TrafficState,
    pub action: usize,
    pub value: f64,
}

/// Epsilon-greedy tabular learner. Unseen pairs are worth 0.
#[derive(Debug, Clone)]
pub struct QLearner {
    table: HashMap<StateAction, f64>,
    learning_rate: f64,
    discount_factor: f64,
    epsilon: f64,
    incumbent_bias: f64,
    rng: SmallRng,
}

impl QLearner {
    pub fn new(config: &LearnerConfig) -> Self {
        Self {
            table: HashMap::new(),
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            epsilon: config.exploration_rate,
            incumbent_bias: config.incumbent_bias,
            rng: SmallRng::seed_from_u64(config.seed),
        }
    }

    pub fn value(&self, state: TrafficState, action: usize) -> f64 {
        self.table
            .get(&StateAction { state, action })
            .copied()
            .unwrap_or(0.0)
    }

    /// Best value over every action from `state`.
    pub fn max_value(&self, state: TrafficState) -> f64 {
        (0..NUM_LANES)
            .map(|action| self.value(state, action))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Epsilon-greedy choice of the next green lane.
    pub fn choose_action(&mut self, state: TrafficState, current_green: usize) -> usize {
        if self.rng.random::<f64>() < self.epsilon {
            return self.rng.random_range(0..NUM_LANES);
        }

        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for action in 0..NUM_LANES {
            let mut value = self.value(state, action);
            if action == current_green {
                value += self.incumbent_bias;
            }
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// One-step Q-learning update.
    pub fn update(
        &mut self,
        state: TrafficState,
        action: usize,
        reward: f64,
        next_state: TrafficState,
    ) {
        let target = reward + self.discount_factor * self.max_value(next_state);
        let slot = self.table.entry(StateAction { state, action }).or_insert(0.0);
        *slot += self.learning_rate * (target - *slot);
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Whether updates should be applied; a learner with no exploration only presents.
    pub fn is_learning(&self) -> bool {
        self.epsilon > 0.0
    }

    /// Multiplies epsilon by `decay` while it is above `floor`.
    pub fn decay_exploration(&mut self, decay: f64, floor: f64) {
        if self.epsilon > floor {
            self.epsilon *= decay;
        }
    }

    /// Number of visited state/action pairs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Writes the table as a JSON list of records, via a temporary file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let mut entries: Vec<QEntry> = self
            .table
            .iter()
            .map(|(key, &value)| QEntry {
                state: key.state,
                action: key.action,
                value,
            })
            .collect();
        entries.sort_by(|a, b| (a.state.0, a.action).cmp(&(b.state.0, b.action)));

        let json = serde_json::to_vec(&entries).map_err(ModelError::Encode)?;
        let tmp = path.with_extension("tmp");
        let io_err = |source: std::io::Error| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        info!("Saved {} table entries to {:?}", entries.len(), path);
        Ok(())
    }

    /// Replaces the table with the one stored at `path`.
    ///
    /// Returns `Ok(false)` when no model exists there. On any error the current table is
    /// left as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<bool, ModelError> {
        let path = path.as_ref();
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No model at {:?}; starting with an empty table", path);
                return Ok(false);
            }
            Err(source) => {
                return Err(ModelError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let entries: Vec<QEntry> =
            serde_json::from_slice(&raw).map_err(|source| ModelError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let mut table = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.action >= NUM_LANES {
                return Err(ModelError::InvalidEntry {
                    path: path.to_path_buf(),
                    action: entry.action,
                });
            }
            table.insert(
                StateAction {
                    state: entry.state,
                    action: entry.action,
                },
                entry.value,
            );
        }

        info!("Loaded {} table entries from {:?}", table.len(), path);
        self.table = table;
        Ok(true)
    }
}
