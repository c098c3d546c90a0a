use log::{debug, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::network::config::ArchitectureConfig;
use crate::network::network::Network;

/// Resolved shape of one dense layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// Turns an `ArchitectureConfig` into a `Network`.
///
/// All validation happens here, before any parameter is allocated: unknown
/// activation names, softmax on a hidden layer, and the output width, which
/// is always `classes.len()` whatever the config's own `size` says.
pub struct NetworkBuilder<'a> {
    config: &'a ArchitectureConfig,
    seed: Option<u64>,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a ArchitectureConfig) -> Self {
        NetworkBuilder { config, seed: None }
    }

    /// Fixes the initialization RNG so two builds produce identical weights.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Resolves every dense layer's width, fan-in and activation.
    pub fn plan(&self) -> Result<Vec<LayerPlan>> {
        let config = self.config;
        config.validate()?;

        let flatten = &config.layers[0];
        if let Some(size) = flatten.size {
            if size != config.input_len() {
                warn!(
                    "layers[0].size = {} ignored, flatten width is {}x{} = {}",
                    size, config.input.width, config.input.height, config.input_len()
                );
            }
        }

        let num_classes = config.num_classes();
        let last = config.layers.len() - 1;
        let mut input_size = config.input_len();
        let mut plan = Vec::with_capacity(last);

        for (i, layer) in config.layers.iter().enumerate().skip(1) {
            let name = layer
                .activation
                .as_deref()
                .ok_or_else(|| Error::config(format!("layers[{i}].activation"), "missing"))?;
            let activation = ActivationFunction::from_name(name, i)?;

            let size = if i == last {
                if let Some(declared) = layer.size {
                    if declared != num_classes {
                        warn!(
                            "layers[{}].size = {} overridden by the class list: output width is {}",
                            i, declared, num_classes
                        );
                    }
                }
                if activation != ActivationFunction::Softmax {
                    warn!(
                        "output activation `{}` is trained with the softmax cross-entropy gradient",
                        activation.name()
                    );
                }
                num_classes
            } else {
                if activation == ActivationFunction::Softmax {
                    return Err(Error::config(
                        format!("layers[{i}].activation"),
                        "softmax is only supported on the output layer",
                    ));
                }
                layer
                    .size
                    .ok_or_else(|| Error::config(format!("layers[{i}].size"), "missing"))?
            };

            plan.push(LayerPlan { size, input_size, activation });
            input_size = size;
        }

        Ok(plan)
    }

    /// Plans and allocates a freshly initialized network.
    pub fn build(&self) -> Result<Network> {
        let plan = self.plan()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        for (i, layer) in plan.iter().enumerate() {
            debug!(
                "dense {}: {} -> {} ({})",
                i, layer.input_size, layer.size, layer.activation.name()
            );
        }

        let shapes = plan
            .into_iter()
            .map(|l| (l.size, l.input_size, l.activation))
            .collect();
        Ok(Network::new(shapes, &mut rng))
    }
}
