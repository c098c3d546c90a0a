use std::time::Instant;

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::EncodedDataset;
use crate::error::{Error, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::network::network::{argmax, Network};
use crate::optim::adam::Adam;
use crate::train::epoch_stats::{EpochStats, TrainingMetrics};
use crate::train::train_config::TrainConfig;

/// Mini-batch Adam on softmax cross-entropy.
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Trainer { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Trains `network` in place for `config.epochs` epochs, evaluating on
    /// `validation` after each one and once more at the end.
    ///
    /// Stops with `Error::Divergence` at the first batch or evaluation whose
    /// loss is not finite, so a network with NaN/Inf parameters never comes
    /// back as `Ok`.
    pub fn train(
        &self,
        network: &mut Network,
        train: &EncodedDataset,
        validation: &EncodedDataset,
    ) -> Result<TrainingMetrics> {
        if train.is_empty() {
            return Err(Error::config("train split", "no training samples"));
        }
        if self.config.batch_size == 0 {
            return Err(Error::config("batch_size", "must be at least 1"));
        }
        check_shapes(network, train, "train")?;
        check_shapes(network, validation, "validation")?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut per_epoch = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let t_start = Instant::now();

            let (train_loss, train_accuracy) = run_one_epoch(
                network,
                train,
                &mut optimizer,
                self.config.batch_size,
                &mut rng,
                epoch,
            )?;
            let (val_loss, val_accuracy) = evaluate(network, validation);
            ensure_finite(val_loss, epoch, "validation")?;

            let stats = EpochStats {
                epoch,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            info!(
                "epoch {}/{}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4} ({} ms)",
                epoch, self.config.epochs, stats.train_loss, stats.train_accuracy,
                stats.val_loss, stats.val_accuracy, stats.elapsed_ms
            );
            per_epoch.push(stats);
        }

        let (final_test_loss, final_test_accuracy) = evaluate(network, validation);
        ensure_finite(final_test_loss, self.config.epochs, "final evaluation")?;
        info!("test: loss {:.4}, accuracy {:.4}", final_test_loss, final_test_accuracy);

        Ok(TrainingMetrics { per_epoch, final_test_loss, final_test_accuracy })
    }
}

fn ensure_finite(loss: f64, epoch: usize, at: &str) -> Result<()> {
    if loss.is_finite() {
        Ok(())
    } else {
        Err(Error::Divergence { epoch, at: at.to_owned(), loss })
    }
}

/// Every input must match the network's fan-in and every target its
/// output width.
fn check_shapes(network: &Network, data: &EncodedDataset, split: &str) -> Result<()> {
    if let Some(bad) = data.inputs.iter().find(|x| x.len() != network.input_size()) {
        return Err(Error::mismatch("train", format!("{split} input width"), network.input_size(), bad.len()));
    }
    if let Some(bad) = data.labels.iter().find(|y| y.len() != network.output_size()) {
        return Err(Error::mismatch("train", format!("{split} label width (classes)"), network.output_size(), bad.len()));
    }
    if data.inputs.len() != data.labels.len() {
        return Err(Error::mismatch("train", format!("{split} label count"), data.inputs.len(), data.labels.len()));
    }
    Ok(())
}

/// One shuffled pass of mini-batch Adam. Returns (mean loss, accuracy).
fn run_one_epoch(
    network: &mut Network,
    data: &EncodedDataset,
    optimizer: &mut Adam,
    batch_size: usize,
    rng: &mut StdRng,
    epoch: usize,
) -> Result<(f64, f64)> {
    let n = data.len();
    let mut total_loss = 0.0;
    let mut correct = 0usize;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for (batch, chunk) in indices.chunks(batch_size).enumerate() {
        let mut acc_grads: Vec<(Matrix, Matrix)> = network.layers.iter()
            .map(|layer| (
                Matrix::zeros(layer.weights.rows, layer.weights.cols),
                Matrix::zeros(layer.biases.rows, layer.biases.cols),
            ))
            .collect();
        let mut batch_loss = 0.0;

        for &idx in chunk {
            let input = &data.inputs[idx];
            let expected = &data.labels[idx];

            let output = network.forward(input);
            batch_loss += CrossEntropyLoss::loss(&output, expected);
            if argmax(&output) == argmax(expected) {
                correct += 1;
            }

            let error = CrossEntropyLoss::derivative(&output, expected);
            let mut delta = Matrix::row(error);

            // Backward pass.
            for i in (0..network.layers.len()).rev() {
                let input_for_layer = if i == 0 {
                    Matrix::row(input.clone())
                } else {
                    network.layers[i - 1].neurons.clone()
                };

                let (w_grad, b_grad) = network.layers[i].compute_gradients(&delta, &input_for_layer);

                if i > 0 {
                    // b_grad is this layer's δ; δ · Wᵀ is ∂L/∂a of layer i-1
                    delta = b_grad.mul_transposed(&network.layers[i].weights);
                }

                acc_grads[i].0 += &w_grad;
                acc_grads[i].1 += &b_grad;
            }
        }

        ensure_finite(batch_loss / chunk.len() as f64, epoch, &format!("batch {}", batch + 1))?;
        total_loss += batch_loss;

        let inv_batch = 1.0 / chunk.len() as f64;
        let mean_grads: Vec<(Matrix, Matrix)> = acc_grads.into_iter()
            .map(|(w, b)| (w.map(|x| x * inv_batch), b.map(|x| x * inv_batch)))
            .collect();
        optimizer.step(&mut network.layers, &mean_grads)?;
    }

    debug!("epoch {}: {} optimizer steps so far", epoch, optimizer.steps());
    Ok((total_loss / n as f64, correct as f64 / n as f64))
}

/// Mean loss and accuracy without touching parameters.
pub fn evaluate(network: &Network, data: &EncodedDataset) -> (f64, f64) {
    let n = data.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let (loss, correct) = data.inputs.iter().zip(data.labels.iter())
        .fold((0.0, 0usize), |(loss, correct), (input, label)| {
            let output = network.predict(input);
            let hit = usize::from(argmax(&output) == argmax(label));
            (loss + CrossEntropyLoss::loss(&output, label), correct + hit)
        });
    (loss / n as f64, correct as f64 / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::config::InputShape;

    fn toy() -> EncodedDataset {
        // class 0: left pixel on, class 1: right pixel on, class 2: blank
        let mut inputs = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..8 {
            inputs.push(vec![1.0, 0.0]);
            labels.push(vec![1.0, 0.0, 0.0]);
            inputs.push(vec![0.0, 1.0]);
            labels.push(vec![0.0, 1.0, 0.0]);
            inputs.push(vec![0.0, 0.0]);
            labels.push(vec![0.0, 0.0, 1.0]);
        }
        EncodedDataset { shape: InputShape { width: 2, height: 1 }, inputs, labels }
    }

    fn net_with(hidden: ActivationFunction, seed: u64) -> Network {
        Network::new(
            vec![
                (16, 2, hidden),
                (3, 16, ActivationFunction::Softmax),
            ],
            &mut StdRng::seed_from_u64(seed),
        )
    }

    fn net(seed: u64) -> Network {
        net_with(ActivationFunction::ReLU, seed)
    }

    #[test]
    fn learns_a_separable_toy_problem() {
        let data = toy();
        let mut network = net(3);
        let trainer = Trainer::new(TrainConfig { epochs: 150, batch_size: 4, learning_rate: 0.01, seed: Some(9) });
        let metrics = trainer.train(&mut network, &data, &data).unwrap();

        assert_eq!(metrics.per_epoch.len(), 150);
        let first = &metrics.per_epoch[0];
        let last = metrics.last_epoch().unwrap();
        assert!(last.train_loss < first.train_loss);
        assert!(metrics.final_test_accuracy > 0.99);
        assert!(metrics.per_epoch.iter().enumerate().all(|(i, s)| s.epoch == i + 1));
    }

    #[test]
    fn same_seed_same_run() {
        let data = toy();
        let trainer = Trainer::new(TrainConfig::new(3, 5).with_seed(1));
        let (mut a, mut b) = (net(2), net(2));
        let ma = trainer.train(&mut a, &data, &data).unwrap();
        let mb = trainer.train(&mut b, &data, &data).unwrap();
        assert_eq!(ma.final_test_loss, mb.final_test_loss);
        assert_eq!(a.layers[0].weights, b.layers[0].weights);
    }

    #[test]
    fn nan_loss_stops_training() {
        let mut data = toy();
        data.inputs[0] = vec![f64::NAN, 0.0];
        // ReLU would map NaN to 0.0, a linear layer carries it through
        let mut network = net_with(ActivationFunction::Identity, 0);
        let trainer = Trainer::new(TrainConfig::new(2, 100).with_seed(0));
        match trainer.train(&mut network, &data, &data) {
            Err(Error::Divergence { epoch, at, loss }) => {
                assert_eq!((epoch, at.as_str()), (1, "batch 1"));
                assert!(!loss.is_finite());
            }
            other => panic!("expected Divergence, got {:?}", other),
        }
    }

    #[test]
    fn blown_up_parameters_fail_at_validation() {
        // one batch per epoch, so the only loss computed after the update
        // is the validation pass
        let data = toy();
        let mut network = net_with(ActivationFunction::Identity, 0);
        let trainer = Trainer::new(TrainConfig {
            epochs: 1,
            batch_size: 100,
            learning_rate: f64::INFINITY,
            seed: Some(0),
        });
        match trainer.train(&mut network, &data, &data) {
            Err(Error::Divergence { epoch, at, loss }) => {
                assert_eq!((epoch, at.as_str()), (1, "validation"));
                assert!(!loss.is_finite());
            }
            other => panic!("expected Divergence, got {:?}", other),
        }
    }

    #[test]
    fn label_width_must_match_output() {
        let mut data = toy();
        for label in data.labels.iter_mut() {
            label.push(0.0);
        }
        let mut network = net(0);
        assert!(matches!(
            Trainer::new(TrainConfig::default()).train(&mut network, &data, &data),
            Err(Error::ConfigMismatch { .. })
        ));
    }

    #[test]
    fn empty_training_split_is_rejected() {
        let empty = EncodedDataset { shape: InputShape { width: 2, height: 1 }, inputs: vec![], labels: vec![] };
        let mut network = net(0);
        assert!(Trainer::new(TrainConfig::default()).train(&mut network, &empty, &empty).is_err());
    }
}
