//! Trained parameters as a flat, ordered JSON object.
//!
//! Key order is part of the format: `weight_{2k}` is the weight matrix of
//! dense layer `k` (shape `[input][output]`) and `weight_{2k+1}` its bias
//! vector. A reader that walks keys by index rebuilds the layers in order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::builder::NetworkBuilder;
use crate::network::config::ArchitectureConfig;
use crate::network::network::Network;

/// One parameter tensor as it appears in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tensor {
    Matrix(Vec<Vec<f64>>),
    Vector(Vec<f64>),
}

impl Tensor {
    /// `[rows, cols]` for a matrix, `[len]` for a vector.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Tensor::Matrix(rows) => vec![rows.len(), rows.first().map(|r| r.len()).unwrap_or(0)],
            Tensor::Vector(v) => vec![v.len()],
        }
    }
}

/// The parameters of a network in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet {
    tensors: Vec<Tensor>,
}

impl WeightSet {
    /// Document key of the `index`-th tensor.
    pub fn key(index: usize) -> String {
        format!("weight_{index}")
    }

    /// Read-only snapshot of `network`: for each layer, weights then bias.
    pub fn from_network(network: &Network) -> WeightSet {
        let tensors = network.layers
            .iter()
            .flat_map(|layer| {
                [
                    Tensor::Matrix(layer.weights.data.clone()),
                    Tensor::Vector(layer.biases.first_row().to_vec()),
                ]
            })
            .collect();
        WeightSet { tensors }
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Fails on the first NaN or infinite entry, which JSON cannot carry.
    pub fn check_finite(&self) -> Result<()> {
        for (i, tensor) in self.tensors.iter().enumerate() {
            let bad = match tensor {
                Tensor::Matrix(rows) => rows.iter().flatten().find(|v| !v.is_finite()),
                Tensor::Vector(v) => v.iter().find(|v| !v.is_finite()),
            };
            if let Some(&value) = bad {
                return Err(Error::NonFiniteWeight { key: WeightSet::key(i), value });
            }
        }
        Ok(())
    }

    pub fn keys(&self) -> Vec<String> {
        (0..self.tensors.len()).map(WeightSet::key).collect()
    }

    /// Parses a weight document. Keys must be exactly `weight_0..weight_{n-1}`.
    pub fn from_json_str(text: &str) -> Result<WeightSet> {
        let mut map: HashMap<String, Tensor> = serde_json::from_str(text)?;
        let mut tensors = Vec::with_capacity(map.len());
        while let Some(tensor) = map.remove(&WeightSet::key(tensors.len())) {
            tensors.push(tensor);
        }
        if let Some(stray) = map.keys().min() {
            return Err(Error::config(
                stray.clone(),
                format!("unexpected key in weight document after {} consecutive tensors", tensors.len()),
            ));
        }
        Ok(WeightSet { tensors })
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<WeightSet> {
        WeightSet::from_json_str(&std::fs::read_to_string(path)?)
    }
}

impl Serialize for WeightSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tensors.len()))?;
        for (i, tensor) in self.tensors.iter().enumerate() {
            map.serialize_entry(&WeightSet::key(i), tensor)?;
        }
        map.end()
    }
}

/// Writes a network's parameters to a fixed path.
pub struct WeightSerializer {
    path: PathBuf,
}

impl WeightSerializer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WeightSerializer { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the whole document, then replaces the file at `path`.
    /// A network with non-finite parameters leaves the file untouched.
    pub fn write(&self, network: &Network) -> Result<WeightSet> {
        let set = WeightSet::from_network(network);
        set.check_finite()?;
        let bytes = serde_json::to_vec(&set)?;
        std::fs::write(&self.path, bytes)?;
        info!("wrote {} tensors to {}", set.len(), self.path.display());
        Ok(set)
    }
}

impl Network {
    /// Rebuilds the network `config` describes from a weight document,
    /// checking every tensor against the planned layer shapes.
    pub fn from_weights(config: &ArchitectureConfig, weights: &WeightSet) -> Result<Network> {
        let plan = NetworkBuilder::new(config).plan()?;
        if weights.len() != plan.len() * 2 {
            return Err(Error::mismatch("weights", "tensor count", plan.len() * 2, weights.len()));
        }

        let mut layers = Vec::with_capacity(plan.len());
        for (k, (layer, pair)) in plan.into_iter().zip(weights.tensors().chunks(2)).enumerate() {
            let (w_key, b_key) = (WeightSet::key(2 * k), WeightSet::key(2 * k + 1));

            let matrix = match &pair[0] {
                Tensor::Matrix(rows)
                    if rows.len() == layer.input_size && rows.iter().all(|r| r.len() == layer.size) =>
                {
                    Matrix::from_data(rows.clone())
                }
                other => {
                    return Err(Error::mismatch(
                        "weights",
                        w_key,
                        format!("{:?}", [layer.input_size, layer.size]),
                        format!("{:?}", other.shape()),
                    ));
                }
            };
            let bias = match &pair[1] {
                Tensor::Vector(v) if v.len() == layer.size => v.clone(),
                other => {
                    return Err(Error::mismatch(
                        "weights",
                        b_key,
                        format!("{:?}", [layer.size]),
                        format!("{:?}", other.shape()),
                    ));
                }
            };

            layers.push(Layer::from_parts(matrix, bias, layer.activation));
        }

        Ok(Network::from_layers(layers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ArchitectureConfig {
        ArchitectureConfig::from_json_str(
            r#"{
                "input": {"width": 3, "height": 2},
                "classes": ["a", "b", "none"],
                "layers": [{}, {"size": 4, "activation": "relu"}, {"size": 5, "activation": "tanh"}, {"activation": "softmax"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn keys_interleave_weight_and_bias_per_layer() {
        let net = NetworkBuilder::new(&config()).with_seed(1).build().unwrap();
        let set = WeightSet::from_network(&net);
        assert_eq!(set.keys(), ["weight_0", "weight_1", "weight_2", "weight_3", "weight_4", "weight_5"]);
        let shapes: Vec<Vec<usize>> = set.tensors().iter().map(Tensor::shape).collect();
        assert_eq!(shapes, vec![vec![6, 4], vec![4], vec![4, 5], vec![5], vec![5, 3], vec![3]]);
    }

    #[test]
    fn document_lists_keys_in_enumeration_order() {
        let net = NetworkBuilder::new(&config()).with_seed(1).build().unwrap();
        let text = serde_json::to_string(&WeightSet::from_network(&net)).unwrap();
        let positions: Vec<usize> = (0..6)
            .map(|i| text.find(&format!("\"weight_{i}\"")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reconstructed_network_computes_the_same_function() {
        let cfg = config();
        let net = NetworkBuilder::new(&cfg).with_seed(11).build().unwrap();
        let text = serde_json::to_string(&WeightSet::from_network(&net)).unwrap();

        let rebuilt = Network::from_weights(&cfg, &WeightSet::from_json_str(&text).unwrap()).unwrap();
        let input = [0.0, 1.0, 1.0, 0.0, 1.0, 0.0];
        assert_eq!(rebuilt.predict(&input), net.predict(&input));
    }

    #[test]
    fn shape_disagreement_names_the_key() {
        let cfg = config();
        let net = NetworkBuilder::new(&cfg).with_seed(1).build().unwrap();
        let mut set = WeightSet::from_network(&net);
        set.tensors[3] = Tensor::Vector(vec![0.0; 2]);
        match Network::from_weights(&cfg, &set) {
            Err(Error::ConfigMismatch { field, .. }) => assert_eq!(field, "weight_3"),
            other => panic!("expected ConfigMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn gaps_in_keys_are_rejected() {
        let text = r#"{"weight_0": [[1.0]], "weight_2": [1.0]}"#;
        match WeightSet::from_json_str(text) {
            Err(Error::Config { field, .. }) => assert_eq!(field, "weight_2"),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_parameters_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_weights.json");

        let mut net = NetworkBuilder::new(&config()).with_seed(5).build().unwrap();
        net.layers[1].biases.data[0][2] = f64::NAN;
        match WeightSerializer::new(&path).write(&net) {
            Err(Error::NonFiniteWeight { key, value }) => {
                assert_eq!(key, "weight_3");
                assert!(value.is_nan());
            }
            other => panic!("expected NonFiniteWeight, got {:?}", other),
        }
        assert!(!path.exists());

        net.layers[1].biases.data[0][2] = 0.0;
        net.layers[0].weights.data[1][0] = f64::NEG_INFINITY;
        assert!(matches!(
            WeightSerializer::new(&path).write(&net),
            Err(Error::NonFiniteWeight { key, .. }) if key == "weight_0"
        ));
    }

    #[test]
    fn writer_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_weights.json");
        std::fs::write(&path, "stale").unwrap();

        let net = NetworkBuilder::new(&config()).with_seed(5).build().unwrap();
        let written = WeightSerializer::new(&path).write(&net).unwrap();
        assert_eq!(WeightSet::load_json(&path).unwrap(), written);
    }
}
