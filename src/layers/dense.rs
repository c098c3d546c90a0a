use rand::Rng;

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully-connected layer: `a = act(x · W + b)`.
///
/// `weights` is `input_size × size`, `biases` is `1 × size`.
#[derive(Debug, Clone)]
pub struct Layer{
    pub size: usize,
    pub neurons: Matrix,
    pre_neurons: Matrix,  // pre-activation values (z = xW + b) needed for correct derivative
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction
}

impl Layer {
    /// New layer with He (ReLU family) or Xavier weights and zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };
        Layer::from_parts(weights, vec![0.0; size], activation)
    }

    /// Layer with known parameters, e.g. read back from a weight document.
    pub fn from_parts(weights: Matrix, biases: Vec<f64>, activation: ActivationFunction) -> Layer {
        let size = weights.cols;
        Layer {
            size,
            neurons: Matrix::zeros(1, size),
            pre_neurons: Matrix::zeros(1, size),
            weights,
            biases: Matrix::row(biases),
            activator: activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    fn pre_activation(&self, input: &[f64]) -> Matrix {
        let mut z = &Matrix::row(input.to_vec()) * &self.weights;
        z += &self.biases;
        z
    }

    /// Forward pass that caches `z` and `a` for the following backward pass.
    pub fn feed_from(&mut self, input: &[f64]) -> Vec<f64> {
        let z = self.pre_activation(input);
        let a = Matrix::row(self.activator.apply(z.first_row()));
        self.pre_neurons = z;
        self.neurons = a;
        self.neurons.first_row().to_vec()
    }

    /// Forward pass without touching the training caches.
    pub fn evaluate(&self, input: &[f64]) -> Vec<f64> {
        let z = self.pre_activation(input);
        self.activator.apply(z.first_row())
    }

    /// Computes gradient adjustments. Returns (weights_grad, biases_grad).
    /// `next_layer_delta` is ∂L/∂a for this layer (error in activation space).
    pub fn compute_gradients(
        &self,
        next_layer_delta: &Matrix,
        inputs: &Matrix,
    ) -> (Matrix, Matrix) {
        // derivative(z), not derivative(a)
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = next_layer_delta.hadamard(&act_derivative);

        let weights_adjustment = &inputs.transpose() * &layer_delta;
        let biases_adjustment = layer_delta;

        (weights_adjustment, biases_adjustment)
    }

    /// Subtracts already-scaled update steps from the parameters.
    pub fn apply_gradients(&mut self, weights_step: &Matrix, biases_step: &Matrix) {
        subtract_in_place(&mut self.weights, weights_step);
        subtract_in_place(&mut self.biases, biases_step);
    }
}

fn subtract_in_place(target: &mut Matrix, step: &Matrix) {
    assert_eq!((target.rows, target.cols), (step.rows, step.cols), "Matrices are of incorrect sizes");
    for (row, step_row) in target.data.iter_mut().zip(step.data.iter()) {
        for (x, s) in row.iter_mut().zip(step_row.iter()) {
            *x -= s;
        }
    }
}
