use rand::Rng;

use crate::{activation::activation::ActivationFunction, layers::dense::Layer};

/// Feed-forward stack of dense layers; the flatten step is implicit because
/// inputs are already row-major pixel vectors.
#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_shapes: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_shapes.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network { layers }
    }

    pub fn from_layers(layers: Vec<Layer>) -> Network {
        Network { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current
    }

    /// Forward pass for evaluation; leaves the backprop caches alone.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        self.layers.iter().fold(input.to_vec(), |current, layer| layer.evaluate(&current))
    }

    /// Output of every layer for one input, first hidden layer first and the
    /// class probabilities last.
    pub fn trace(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut outputs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let next = layer.evaluate(outputs.last().map(|v| v.as_slice()).unwrap_or(input));
            outputs.push(next);
        }
        outputs
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
