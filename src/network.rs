use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::activations::Activation;
use crate::error::Result;
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// A fully connected layer: weights, biases, and an activation function.
///
/// The layer caches its inputs and pre-activation outputs during the forward
/// pass; `backward_batch` requires a preceding `forward_batch` on the same
/// inputs.
#[derive(Serialize, Deserialize, Clone)]
pub struct Layer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    pre_activation_output: Option<Array2<f32>>,
    inputs: Option<Array2<f32>>,
}

impl Layer {
    /// Create a new layer with the given input size, output size, and
    /// activation function. Weights are drawn from Uniform(-0.1, 0.1),
    /// biases start at zero.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        let weights = Array2::random((input_size, output_size), Uniform::new(-0.1, 0.1));
        let biases = Array1::zeros(output_size);
        Layer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Forward pass for a batch of input vectors.
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.to_owned().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Gradients of weights and biases for a batch of output errors, plus the
    /// activation-adjusted error to propagate to the previous layer.
    fn backward_batch(&self, output_errors: ArrayView2<f32>) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
        let pre_activation_output = self
            .pre_activation_output
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let inputs = self
            .inputs
            .as_ref()
            .expect("forward_batch() must be called before backward_batch()");
        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        (adjusted_error, weight_gradients, bias_gradients)
    }
}

/// A feed-forward action-value network: observation vector in, one value
/// estimate per action out. Owns its optimizer so saved snapshots restore
/// momentum along with the parameters.
#[derive(Serialize, Deserialize, Clone)]
pub struct QNetwork {
    pub layers: Vec<Layer>,
    pub optimizer: OptimizerWrapper,
}

impl QNetwork {
    /// Create a network from consecutive layer sizes and matching activations.
    /// `layer_sizes.len() - 1` must equal `activations.len()`.
    pub fn new(layer_sizes: &[usize], activations: &[Activation], optimizer: OptimizerWrapper) -> Self {
        assert_eq!(layer_sizes.len() - 1, activations.len());

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| Layer::new(window[0], window[1], activation))
            .collect::<Vec<_>>();

        QNetwork { layers, optimizer }
    }

    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = layers;
        self
    }

    /// Number of action values produced by the output layer.
    pub fn output_size(&self) -> usize {
        self.layers.last().map(|layer| layer.output_size()).unwrap_or(0)
    }

    /// Forward pass for a single observation vector.
    pub fn forward(&mut self, input: ArrayView1<f32>) -> Array1<f32> {
        let input = input.insert_axis(Axis(0)); // Treat single instance as a minibatch of size 1
        let output = self.forward_batch(input.view());
        let output_shape = output.shape()[1];
        output.into_shape((output_shape,)).unwrap() // Remove the batch dimension
    }

    /// Forward pass for a batch of observation vectors.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &mut self.layers {
            current_output = layer.forward_batch(current_output.view());
        }
        current_output
    }

    /// Backpropagate a batch of output errors, returning per-layer weight and
    /// bias gradients in layer order.
    fn backward_batch(&mut self, output_errors: ArrayView2<f32>) -> Vec<(Array2<f32>, Array1<f32>)> {
        let mut gradients: Vec<(Array2<f32>, Array1<f32>)> = Vec::new();
        let mut current_error = output_errors.to_owned();

        let length = self.layers.len();
        for i in (0..length).rev() {
            let layer = &mut self.layers[i];
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(current_error.view());
            gradients.push((weight_gradients, bias_gradients));

            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        gradients
    }

    /// One gradient-descent step toward the target outputs. Returns the mean
    /// squared error of the batch before the update.
    pub fn train_minibatch(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
    ) -> f32 {
        let outputs = self.forward_batch(inputs);
        let output_errors = &outputs - &targets;
        let loss = output_errors.mapv(|e| e * e).mean().unwrap_or(f32::INFINITY);
        let gradients = self.backward_batch(output_errors.view());

        for (index, (layer, (weight_gradients, bias_gradients))) in
            self.layers.iter_mut().zip(gradients).enumerate()
        {
            self.optimizer
                .update_weights(index, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer
                .update_biases(index, &mut layer.biases, &bias_gradients, learning_rate);
        }

        loss
    }

    /// Serialize the network (parameters and optimizer state) to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    /// Load a network previously written by [`QNetwork::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let deserialized: Self = bincode::deserialize(&buffer)?;
        Ok(deserialized)
    }
}
