use serde::{Deserialize, Serialize};

use crate::global_variables::NUM_LANES;

/// Discretized intersection state: the queue length of every approach, clamped to a ceiling.
///
/// Used as the state half of the learner's table key, so it hashes and compares by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrafficState(pub [usize; NUM_LANES]);

impl TrafficState {
    /// Builds a state from raw queue lengths, clamping each one to `ceiling`.
    pub fn from_queue_lengths(lengths: [usize; NUM_LANES], ceiling: usize) -> Self {
        Self(lengths.map(|len| len.min(ceiling)))
    }

    pub fn queue_lengths(&self) -> &[usize; NUM_LANES] {
        &self.0
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}
