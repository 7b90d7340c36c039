use ndarray::Array1;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{PilotError, Result};

/// Default transition capacity of a fresh buffer.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// One recorded step: the observation the agent acted from, the action it
/// took, the reward that came back, and the observation that followed.
/// Immutable once pushed; sampling hands out shared references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
}

/// Fixed-capacity FIFO store of transitions with uniform random sampling.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest entry at capacity.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` transitions uniformly at random without replacement.
    /// Errors with `InsufficientData` when fewer transitions are stored.
    pub fn sample(&self, batch_size: usize) -> Result<Vec<&Transition>> {
        if self.buffer.len() < batch_size {
            return Err(PilotError::InsufficientData {
                available: self.buffer.len(),
                requested: batch_size,
            });
        }
        let mut rng = thread_rng();
        let indices = rand::seq::index::sample(&mut rng, self.buffer.len(), batch_size);
        Ok(indices.into_iter().map(|i| &self.buffer[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        ReplayBuffer::new(DEFAULT_CAPACITY)
    }
}
