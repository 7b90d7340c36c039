use crate::activations::Activation;
use crate::network::{Layer, QNetwork};
use crate::optimizer::{OptimizerWrapper, SGD};
use ndarray::{array, Array2};

fn network(layer_sizes: &[usize], activations: &[Activation]) -> QNetwork {
    QNetwork::new(layer_sizes, activations, OptimizerWrapper::SGD(SGD::new()))
}

#[test]
fn test_forward_shape() {
    let mut net = network(&[5, 30, 3], &[Activation::Relu, Activation::Linear]);
    let output = net.forward(array![0.1, 0.2, 0.3, 0.4, 0.5].view());
    assert_eq!(output.len(), 3);
    assert_eq!(net.output_size(), 3);
}

#[test]
fn test_forward_batch_shape() {
    let mut net = network(&[2, 4, 3], &[Activation::Relu, Activation::Linear]);
    let inputs: Array2<f32> = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6], [0.7, 0.8]];
    let outputs = net.forward_batch(inputs.view());
    assert_eq!(outputs.dim(), (4, 3));
}

#[test]
fn test_forward_deterministic_with_fixed_weights() {
    // Single linear layer: output = input . W + b
    let layer = Layer::new(2, 2, Activation::Linear)
        .with_weights(array![[1.0, 0.0], [0.0, 1.0]])
        .with_biases(array![1.0, -1.0]);
    let mut net =
        network(&[2, 2], &[Activation::Linear]).with_layers(vec![layer]);

    let output = net.forward(array![2.0, 3.0].view());
    assert_eq!(output, array![3.0, 2.0]);
}

#[test]
fn test_train_minibatch_reduces_loss() {
    let mut net = network(&[2, 8, 1], &[Activation::Relu, Activation::Linear]);
    let inputs: Array2<f32> = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let targets: Array2<f32> = array![[0.0], [1.0], [1.0], [0.0]];

    let first_loss = net.train_minibatch(inputs.view(), targets.view(), 0.05);
    let mut last_loss = first_loss;
    for _ in 0..200 {
        last_loss = net.train_minibatch(inputs.view(), targets.view(), 0.05);
    }
    assert!(last_loss < first_loss);
    assert!(last_loss.is_finite());
}

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net.bin");

    let mut net = network(&[5, 30, 3], &[Activation::Relu, Activation::Linear]);
    let observation = array![0.2, 0.4, 0.6, 0.5, -0.5];
    let before = net.forward(observation.view());

    net.save(&path).unwrap();
    let mut restored = QNetwork::load(&path).unwrap();
    let after = restored.forward(observation.view());

    assert_eq!(before, after);
}

#[test]
fn test_load_missing_file_is_error() {
    let result = QNetwork::load("definitely/not/a/real/path.bin");
    assert!(result.is_err());
}
