use serde::{Serialize, Deserialize};

/// Statistics for one completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean cross-entropy over the training samples seen this epoch.
    pub train_loss: f64,
    /// Fraction in [0, 1] of training samples classified correctly while
    /// the epoch ran.
    pub train_accuracy: f64,
    /// Mean cross-entropy on the validation split after the epoch.
    pub val_loss: f64,
    pub val_accuracy: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Everything a finished training run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub per_epoch: Vec<EpochStats>,
    pub final_test_loss: f64,
    pub final_test_accuracy: f64,
}

impl TrainingMetrics {
    pub fn last_epoch(&self) -> Option<&EpochStats> {
        self.per_epoch.last()
    }
}
