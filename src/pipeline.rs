use std::path::PathBuf;

use log::info;

use crate::data::augment::{AugmentPolicy, DatasetAugmenter};
use crate::data::dataset::DatasetProvider;
use crate::data::encoder::LabelEncoder;
use crate::error::Result;
use crate::export::examples::{ExampleExporter, ExportedExample};
use crate::export::weights::{WeightSerializer, WeightSet};
use crate::network::builder::NetworkBuilder;
use crate::network::config::ArchitectureConfig;
use crate::network::network::Network;
use crate::train::epoch_stats::TrainingMetrics;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::Trainer;

/// Where the run's artifacts go.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub weights: PathBuf,
    pub examples_dir: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        OutputPaths {
            weights: PathBuf::from("model_weights.json"),
            examples_dir: PathBuf::from("examples"),
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub network: Network,
    pub metrics: TrainingMetrics,
    pub weights: WeightSet,
    pub weights_path: PathBuf,
    pub examples: Vec<ExportedExample>,
}

/// Augment → encode → build → train → serialize → export, in that order.
pub struct Pipeline {
    config: ArchitectureConfig,
    policy: AugmentPolicy,
    training: TrainConfig,
    outputs: OutputPaths,
    seed: Option<u64>,
}

impl Pipeline {
    pub fn new(config: ArchitectureConfig) -> Self {
        Pipeline {
            config,
            policy: AugmentPolicy::default(),
            training: TrainConfig::default(),
            outputs: OutputPaths::default(),
            seed: None,
        }
    }

    pub fn with_policy(mut self, policy: AugmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_training(mut self, training: TrainConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_outputs(mut self, outputs: OutputPaths) -> Self {
        self.outputs = outputs;
        self
    }

    /// Seeds weight initialization and, unless the training config has its
    /// own seed, the shuffle order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &ArchitectureConfig {
        &self.config
    }

    pub fn run(&self, provider: &dyn DatasetProvider) -> Result<RunReport> {
        let config = &self.config;
        // Resolves activation names too, so a bad config never reaches the data.
        NetworkBuilder::new(config).plan()?;

        let (raw_train, raw_test) = provider.load()?;

        let augmenter = DatasetAugmenter::new(config, self.policy);
        let (train, test) = augmenter.augment_splits(&raw_train, &raw_test)?;

        let encoder = LabelEncoder::new(config.num_classes());
        let train = encoder.encode(&train)?;
        let test = encoder.encode(&test)?;

        // A class missing from the test split is known now, not after training.
        let exporter = ExampleExporter::new(config, &self.outputs.examples_dir);
        let examples = exporter.select(&test)?;

        let mut builder = NetworkBuilder::new(config);
        if let Some(seed) = self.seed {
            builder = builder.with_seed(seed);
        }
        let mut network = builder.build()?;

        let mut training = self.training.clone();
        if training.seed.is_none() {
            training.seed = self.seed;
        }
        info!(
            "training {} epochs, batch size {}, on {} samples",
            training.epochs, training.batch_size, train.len()
        );
        let metrics = Trainer::new(training).train(&mut network, &train, &test)?;

        let serializer = WeightSerializer::new(&self.outputs.weights);
        let weights = serializer.write(&network)?;
        let examples = exporter.write(&examples)?;

        Ok(RunReport {
            network,
            metrics,
            weights,
            weights_path: serializer.path().to_path_buf(),
            examples,
        })
    }
}
