pub mod epoch_stats;
pub mod train_config;
pub mod trainer;

pub use epoch_stats::{EpochStats, TrainingMetrics};
pub use train_config::TrainConfig;
pub use trainer::{evaluate, Trainer};
