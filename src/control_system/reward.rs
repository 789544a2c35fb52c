use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::global_variables::{
    FLOW_BONUS, QUEUE_PENALTY_SCALE, REWARD_CLIP, SWITCH_PENALTY, WAIT_DELTA_SCALE,
};

/// Weights of the shaped reward. Defaults keep the tuned relative magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Total queue length is divided by this.
    pub queue_scale: f64,
    /// Change in accumulated wait ticks is divided by this.
    pub wait_scale: f64,
    /// Bonus while the green lane has vehicles to serve.
    pub flow_bonus: f64,
    /// Charged on the step a phase switch is made.
    pub switch_penalty: f64,
    /// Reward is clipped to `[-clip, clip]`.
    pub clip: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            queue_scale: QUEUE_PENALTY_SCALE,
            wait_scale: WAIT_DELTA_SCALE,
            flow_bonus: FLOW_BONUS,
            switch_penalty: SWITCH_PENALTY,
            clip: REWARD_CLIP,
        }
    }
}

impl RewardWeights {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.queue_scale > 0.0 && self.wait_scale > 0.0 && self.clip > 0.0) {
            return Err(SimError::InvalidConfig {
                reason: "reward queue_scale, wait_scale and clip must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Inputs observed at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardInputs {
    pub total_queue: usize,
    pub previous_wait: u64,
    pub current_wait: u64,
    pub green_queue: usize,
    pub switched: bool,
}

/// Breakdown of one step's reward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardComponents {
    pub queue_penalty: f64,
    pub wait_delta: f64,
    pub flow_bonus: f64,
    pub change_penalty: f64,
    /// Clipped sum of the terms above.
    pub total: f64,
}

/// Computes the shaped reward for one tick.
pub fn compute_reward(weights: &RewardWeights, inputs: &RewardInputs) -> RewardComponents {
    let queue_penalty = -(inputs.total_queue as f64 / weights.queue_scale);
    let wait_delta =
        (inputs.previous_wait as f64 - inputs.current_wait as f64) / weights.wait_scale;
    let flow_bonus = if inputs.green_queue > 0 {
        weights.flow_bonus
    } else {
        0.0
    };
    let change_penalty = if inputs.switched {
        -weights.switch_penalty
    } else {
        0.0
    };

    let raw = queue_penalty + wait_delta + flow_bonus + change_penalty;
    RewardComponents {
        queue_penalty,
        wait_delta,
        flow_bonus,
        change_penalty,
        total: raw.clamp(-weights.clip, weights.clip),
    }
}
