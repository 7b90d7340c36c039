//! The Deep Q-Learning agent.
//!
//! The agent runs a one-step-delayed temporal-difference scheme: each call to
//! [`DqnAgent::update`] receives the reward earned by the *previous* action,
//! closes that pending transition into the replay buffer, performs one
//! learning step when enough experience has accumulated, and selects the next
//! action. The pending transition is held explicitly as `last_state` /
//! `last_action` so the temporal contract stays visible and testable.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{rngs::ThreadRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

use crate::activations::Activation;
use crate::error::{PilotError, Result};
use crate::network::QNetwork;
use crate::optimizer::OptimizerWrapper;
use crate::replay_buffer::{ReplayBuffer, Transition, DEFAULT_CAPACITY as DEFAULT_MEMORY_CAPACITY};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_LEARN_START: usize = 100;
const DEFAULT_WINDOW_CAPACITY: usize = 1000;
const DEFAULT_LEARNING_RATE: f32 = 1e-3;

/// Deep Q-Network agent with experience replay and softmax exploration.
///
/// Action selection draws from a softmax over *scaled* action values,
/// probability proportional to `exp(temperature * q)`. This is the inverse of
/// the classic softmax-temperature convention: a larger temperature
/// exaggerates the best action's dominance. `temperature: None` selects
/// greedily.
///
/// By default the same network produces both behavior values and bootstrap
/// targets. A periodically-synced target network can be enabled through the
/// builder to trade fidelity for training stability.
#[derive(Serialize, Deserialize)]
pub struct DqnAgent {
    /// Action-value network (behavior and, unless decoupled, target function)
    pub network: QNetwork,

    /// Optional frozen copy used only for bootstrap targets
    pub(crate) target_network: Option<QNetwork>,

    /// Sync the target network every this many training steps
    target_sync: Option<usize>,

    /// Replay memory is transient: the saved artifact carries parameters,
    /// optimizer state and the reward window, not past experience.
    #[serde(skip)]
    pub(crate) memory: ReplayBuffer,

    pub gamma: f32,

    /// Inverse exploration temperature; `None` means greedy selection
    pub temperature: Option<f32>,

    pub learning_rate: f32,

    batch_size: usize,

    /// Learning is skipped until the buffer holds more than this many transitions
    learn_start: usize,

    reward_window: VecDeque<f32>,
    window_capacity: usize,

    /// Pending transition: the state the last action was chosen from
    pub(crate) last_state: Array1<f32>,
    /// Pending transition: the last chosen action
    pub(crate) last_action: usize,

    /// Number of learning steps performed
    pub train_steps: usize,

    #[serde(skip)]
    rng: ThreadRng,
}

impl DqnAgent {
    /// Create an agent with a `[input, 30, actions]` architecture and the
    /// default replay/learning hyperparameters.
    pub fn new(
        input_size: usize,
        action_count: usize,
        gamma: f32,
        optimizer: OptimizerWrapper,
    ) -> Self {
        let layer_sizes = [input_size, 30, action_count];
        let activations = [Activation::Relu, Activation::Linear];
        let network = QNetwork::new(&layer_sizes, &activations, optimizer);

        DqnAgent {
            network,
            target_network: None,
            target_sync: None,
            memory: ReplayBuffer::new(DEFAULT_MEMORY_CAPACITY),
            gamma,
            temperature: Some(100.0),
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
            learn_start: DEFAULT_LEARN_START,
            reward_window: VecDeque::with_capacity(DEFAULT_WINDOW_CAPACITY),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            last_state: Array1::zeros(input_size),
            last_action: 0,
            train_steps: 0,
            rng: rand::thread_rng(),
        }
    }

    /// Number of actions the agent can select from.
    pub fn action_count(&self) -> usize {
        self.network.output_size()
    }

    /// Number of transitions currently held by the replay buffer.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Select an action for the given observation.
    ///
    /// With a configured temperature the action is sampled from
    /// `softmax(temperature * q_values)`; degenerate distributions fall back
    /// to a uniform random choice. Without a temperature the arg-max action
    /// is returned. The result is always a valid action id.
    pub fn select_action(&mut self, state: ArrayView1<f32>) -> usize {
        let q_values = self.network.forward(state);
        let num_actions = q_values.len();

        match self.temperature {
            Some(temperature) => {
                // Max-subtraction keeps exp() finite for any value scale.
                let max_q = q_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let weights = q_values.mapv(|q| ((q - max_q) * temperature).exp());
                if weights.iter().any(|w| !w.is_finite()) {
                    return self.rng.gen_range(0..num_actions);
                }
                match WeightedIndex::new(weights.iter()) {
                    Ok(dist) => dist.sample(&mut self.rng),
                    Err(_) => self.rng.gen_range(0..num_actions),
                }
            }
            None => q_values
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0),
        }
    }

    /// One gradient step on a batch of transitions against the Bellman target
    /// `reward + gamma * max_a' Q(next_state)[a']`. Returns the batch loss.
    pub fn learn(&mut self, batch: &[Transition]) -> Result<f32> {
        if batch.is_empty() {
            return Err(PilotError::InsufficientData {
                available: 0,
                requested: 1,
            });
        }

        let batch_size = batch.len();
        let state_size = batch[0].state.len();

        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        for (i, transition) in batch.iter().enumerate() {
            states.row_mut(i).assign(&transition.state);
            next_states.row_mut(i).assign(&transition.next_state);
        }

        let current_q = self.network.forward_batch(states.view());
        let next_q = match &mut self.target_network {
            Some(target) => target.forward_batch(next_states.view()),
            None => self.network.forward_batch(next_states.view()),
        };

        // Targets equal current predictions except at the taken actions, so
        // the error is zero everywhere the Bellman update does not apply.
        let mut targets = current_q;
        for (i, transition) in batch.iter().enumerate() {
            if transition.action >= targets.ncols() {
                return Err(PilotError::InvalidAction {
                    action: transition.action,
                    max_actions: targets.ncols(),
                });
            }
            let max_next = next_q
                .row(i)
                .iter()
                .fold(f32::NEG_INFINITY, |max, &v| max.max(v));
            targets[[i, transition.action]] = transition.reward + self.gamma * max_next;
        }

        let loss = self
            .network
            .train_minibatch(states.view(), targets.view(), self.learning_rate);

        self.train_steps += 1;
        if let Some(period) = self.target_sync {
            if self.target_network.is_some() && self.train_steps % period == 0 {
                self.target_network = Some(self.network.clone());
            }
        }

        Ok(loss)
    }

    /// Advance the agent by one tick.
    ///
    /// `reward` is the reward earned by the previous action; `new_state` is
    /// the observation that followed it. Records the completed transition,
    /// learns from a replay batch once the buffer is warm, and returns the
    /// action chosen for `new_state`.
    pub fn update(&mut self, reward: f32, new_state: Array1<f32>) -> usize {
        self.memory.push(Transition {
            state: self.last_state.clone(),
            action: self.last_action,
            reward,
            next_state: new_state.clone(),
        });

        if self.memory.len() > self.learn_start {
            // Transitions are copied out of the buffer; batches are never
            // mutated in place.
            let batch: Vec<Transition> = match self.memory.sample(self.batch_size) {
                Ok(sampled) => sampled.into_iter().cloned().collect(),
                Err(err) => {
                    debug!("learning step skipped: {}", err);
                    Vec::new()
                }
            };
            if !batch.is_empty() {
                if let Err(err) = self.learn(&batch) {
                    debug!("learning step failed: {}", err);
                }
            }
        }

        let action = self.select_action(new_state.view());
        self.last_state = new_state;
        self.last_action = action;

        if self.reward_window.len() >= self.window_capacity {
            self.reward_window.pop_front();
        }
        self.reward_window.push_back(reward);

        action
    }

    /// Mean of the sliding reward window; 0 when no rewards were recorded yet.
    pub fn score(&self) -> f32 {
        if self.reward_window.is_empty() {
            return 0.0;
        }
        self.reward_window.iter().sum::<f32>() / self.reward_window.len() as f32
    }

    /// Serialize the agent (network parameters, optimizer state and reward
    /// window) to a single artifact on disk. Replay memory is not persisted.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Restore an agent previously written by [`DqnAgent::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mut agent: Self = bincode::deserialize(&data)?;
        agent.rng = rand::thread_rng();
        Ok(agent)
    }
}

/// Builder for [`DqnAgent`] with validation of the action-count invariant:
/// the network's output width, the action enumeration and any caller-side
/// action table must all derive from one configured `action_count`.
pub struct DqnAgentBuilder {
    layer_sizes: Vec<usize>,
    gamma: f32,
    temperature: Option<f32>,
    optimizer: Option<OptimizerWrapper>,
    memory_capacity: usize,
    batch_size: usize,
    learn_start: usize,
    learning_rate: f32,
    window_capacity: usize,
    target_sync: Option<usize>,
}

impl DqnAgentBuilder {
    pub fn new() -> Self {
        DqnAgentBuilder {
            layer_sizes: vec![],
            gamma: 0.9,
            temperature: Some(100.0),
            optimizer: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            learn_start: DEFAULT_LEARN_START,
            learning_rate: DEFAULT_LEARNING_RATE,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            target_sync: None,
        }
    }

    pub fn layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.layer_sizes = sizes.to_vec();
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// `None` disables exploration (greedy selection).
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerWrapper) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn learn_start(mut self, learn_start: usize) -> Self {
        self.learn_start = learn_start;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Enable the periodically-synced target network.
    pub fn target_sync(mut self, period: usize) -> Self {
        self.target_sync = Some(period);
        self
    }

    pub fn build(self) -> Result<DqnAgent> {
        if self.layer_sizes.len() < 2 {
            return Err(PilotError::InvalidParameter {
                name: "layer_sizes".to_string(),
                reason: "Must have at least input and output layers".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(PilotError::InvalidParameter {
                name: "batch_size".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.learn_start < self.batch_size {
            return Err(PilotError::InvalidParameter {
                name: "learn_start".to_string(),
                reason: "Must be at least batch_size so sampling never underflows".to_string(),
            });
        }

        let optimizer = self.optimizer.ok_or_else(|| PilotError::InvalidParameter {
            name: "optimizer".to_string(),
            reason: "Optimizer must be specified".to_string(),
        })?;

        let mut activations = vec![Activation::Relu; self.layer_sizes.len() - 2];
        activations.push(Activation::Linear);
        let network = QNetwork::new(&self.layer_sizes, &activations, optimizer);
        let target_network = self.target_sync.map(|_| network.clone());
        let input_size = self.layer_sizes[0];

        Ok(DqnAgent {
            network,
            target_network,
            target_sync: self.target_sync,
            memory: ReplayBuffer::new(self.memory_capacity),
            gamma: self.gamma,
            temperature: self.temperature,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            learn_start: self.learn_start,
            reward_window: VecDeque::with_capacity(self.window_capacity),
            window_capacity: self.window_capacity,
            last_state: Array1::zeros(input_size),
            last_action: 0,
            train_steps: 0,
            rng: rand::thread_rng(),
        })
    }
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
