pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod data;
pub mod export;
pub mod pipeline;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{ArchitectureConfig, InputShape, LayerConfig, Network, NetworkBuilder};
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::adam::Adam;
pub use train::{EpochStats, TrainConfig, Trainer, TrainingMetrics};
pub use data::{
    AugmentPolicy, DatasetAugmenter, DatasetProvider, EncodedDataset, IdxDataset, InMemoryDataset,
    LabelEncoder, RawImage, RawSplit,
};
pub use export::{ExampleExporter, WeightSerializer, WeightSet};
pub use pipeline::{OutputPaths, Pipeline, RunReport};
