use serde::{Serialize, Deserialize};
use std::f64::consts::{E, PI};

use crate::error::{Error, Result};

/// Slope used for `leaky_relu` when named from a config file.
const DEFAULT_LEAKY_ALPHA: f64 = 0.01;
/// Scale used for `elu` when named from a config file.
const DEFAULT_ELU_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    /// Softmax is vector-valued; `apply()` normalizes the whole layer output.
    /// The element-wise `function()` is never used for this variant.
    Softmax,
    Tanh,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    /// Resolves an activation by the name used in architecture configs.
    ///
    /// `layer` is only used to label the error.
    pub fn from_name(name: &str, layer: usize) -> Result<ActivationFunction> {
        let act = match name.trim().to_ascii_lowercase().as_str() {
            "relu" => ActivationFunction::ReLU,
            "softmax" => ActivationFunction::Softmax,
            "sigmoid" => ActivationFunction::Sigmoid,
            "linear" | "identity" => ActivationFunction::Identity,
            "tanh" => ActivationFunction::Tanh,
            "leaky_relu" => ActivationFunction::LeakyReLU { alpha: DEFAULT_LEAKY_ALPHA },
            "elu" => ActivationFunction::Elu { alpha: DEFAULT_ELU_ALPHA },
            "gelu" => ActivationFunction::Gelu,
            "swish" => ActivationFunction::Swish,
            _ => {
                return Err(Error::UnknownActivation { layer, name: name.to_owned() });
            }
        };
        Ok(act)
    }

    /// Canonical config name, the inverse of `from_name`.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Identity => "linear",
            ActivationFunction::Softmax => "softmax",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::LeakyReLU { .. } => "leaky_relu",
            ActivationFunction::Elu { .. } => "elu",
            ActivationFunction::Gelu => "gelu",
            ActivationFunction::Swish => "swish",
        }
    }

    /// Whether He initialization suits this activation (the ReLU family).
    pub fn prefers_he_init(&self) -> bool {
        matches!(
            self,
            ActivationFunction::ReLU
                | ActivationFunction::LeakyReLU { .. }
                | ActivationFunction::Elu { .. }
                | ActivationFunction::Gelu
                | ActivationFunction::Swish
        )
    }

    /// Applies the activation to a whole pre-activation vector.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Element-wise activation. `Softmax` goes through `apply()` instead.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Softmax => {
                // Only reachable through a misuse of the element-wise path.
                unreachable!("softmax is applied to the whole vector in ActivationFunction::apply()")
            }
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (E.powf(x) - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + E.powf(-x)),
        }
    }

    /// Element-wise derivative of the activation.
    ///
    /// For `Softmax` the trainer pairs it with cross-entropy, whose combined
    /// gradient `predicted - expected` is already w.r.t. the logits, so `1.0`
    /// passes that delta through unchanged.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Softmax => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * E.powf(x) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = 1.0 / (1.0 + E.powf(-x));
                sig + x * sig * (1.0 - sig)
            }
        }
    }
}

/// Numerically stable softmax (shifted by the max logit).
fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
