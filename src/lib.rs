//! # Sandpilot - Deep Q-Learning Navigation Core
//!
//! Sandpilot trains a simulated car to drive across a 2-D field toward
//! alternating corner goals while avoiding painted "sand" obstacles. The
//! crate is the learning and simulation core: a small feed-forward Q-network,
//! an experience replay buffer, the DQN agent tying them together, and the
//! synchronous simulation stepper that feeds the agent observations and
//! rewards. Presentation (canvas drawing, HTTP endpoints) lives outside and
//! drives the core through [`sim::Simulation`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sandpilot::sim::{SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! sim.restore("last_brain.bin").unwrap(); // warm start if an artifact exists
//!
//! sim.paint_segment(100, 100, 400, 100).unwrap();
//! for _ in 0..1000 {
//!     sim.advance_tick();
//! }
//! println!("score: {:.3}", sim.score());
//! sim.save_agent("last_brain.bin").unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions for network layers
//! - [`agent`] - The DQN agent: action selection, replay learning, scoring
//! - [`error`] - Error types and result handling
//! - [`network`] - The feed-forward action-value network
//! - [`optimizer`] - Gradient-descent update rules (SGD, Adam)
//! - [`replay_buffer`] - Bounded transition store with uniform sampling
//! - [`sim`] - Sand field, vehicle kinematics, and the tick loop

pub mod activations;
pub mod agent;
pub mod error;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod sim;

#[cfg(test)]
mod tests;
