/// Configuration for a `Trainer` run.
///
/// # Fields
/// - `epochs`       : total number of full passes over the training data
/// - `batch_size`   : samples per mini-batch
/// - `learning_rate`: Adam step size
/// - `seed`         : fixes the per-epoch shuffle order; `None` draws from entropy
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: Option<u64>,
}

impl TrainConfig {
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig { epochs, batch_size, ..TrainConfig::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for TrainConfig {
    /// 5 epochs of batch-32 Adam at 0.001.
    fn default() -> Self {
        TrainConfig { epochs: 5, batch_size: 32, learning_rate: 0.001, seed: None }
    }
}
