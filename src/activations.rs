//! Activation functions for Q-network layers.
//!
//! The value surface over observations is non-linear, so hidden layers use
//! ReLU while the output layer stays linear (raw action values). Sigmoid and
//! Tanh are available for experiments with bounded hidden units.

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// An enumeration of the activation functions usable in a network layer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Apply the activation function to an input array in-place.
    pub fn apply(&self, input: &mut Array1<f32>) {
        match self {
            Activation::Relu => {
                input.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::Sigmoid => {
                input.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
            }
            Activation::Tanh => {
                input.mapv_inplace(|v| v.tanh());
            }
        }
    }

    /// Apply the activation function to a batch of input arrays in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::Sigmoid => {
                inputs.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
            }
            Activation::Tanh => {
                inputs.mapv_inplace(|v| v.tanh());
            }
        }
    }

    /// Compute the derivative of the activation function for an input array.
    pub fn derivative(&self, input: &Array1<f32>) -> Array1<f32> {
        match self {
            Activation::Relu => input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array1::ones(input.len()),
            Activation::Sigmoid => input.mapv(|v| {
                let sigmoid = 1.0 / (1.0 + (-v).exp());
                sigmoid * (1.0 - sigmoid)
            }),
            Activation::Tanh => input.mapv(|v| {
                let tanh_v = v.tanh();
                1.0 - tanh_v * tanh_v
            }),
        }
    }

    /// Compute the derivative of the activation function for a batch of inputs.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(inputs.dim()),
            Activation::Sigmoid => inputs.mapv(|v| {
                let sigmoid = 1.0 / (1.0 + (-v).exp());
                sigmoid * (1.0 - sigmoid)
            }),
            Activation::Tanh => inputs.mapv(|v| {
                let tanh_v = v.tanh();
                1.0 - tanh_v * tanh_v
            }),
        }
    }
}
