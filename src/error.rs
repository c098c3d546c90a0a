//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Everything that can abort a run.
///
/// None of these are recoverable: the pipeline stops at the first one and
/// never writes a partial artifact.
#[derive(Error, Debug)]
pub enum Error {
    /// The config file is malformed or a required field is missing/invalid.
    #[error("configuration error in `{field}`: {reason}")]
    Config { field: String, reason: String },

    /// Declared shape (config) and actual shape (data, weights) disagree.
    #[error("{stage}: `{field}` mismatch, declared {declared} but found {actual}")]
    ConfigMismatch {
        stage: &'static str,
        field: String,
        declared: String,
        actual: String,
    },

    #[error("layer {layer}: unknown activation `{name}`")]
    UnknownActivation { layer: usize, name: String },

    #[error("{stage}: sample {sample} has label {label}, outside [0, {limit})")]
    LabelRange {
        stage: &'static str,
        sample: usize,
        label: usize,
        limit: usize,
    },

    #[error("no example of class `{class}` (index {index}) in the test split")]
    NoExampleFound { class: String, index: usize },

    /// `at` is the batch (`"batch 3"`) or the evaluation pass that saw it.
    #[error("training diverged at epoch {epoch}, {at}: loss = {loss}")]
    Divergence { epoch: usize, at: String, loss: f64 },

    #[error("`{key}` holds a non-finite value ({value}), refusing to write it")]
    NonFiniteWeight { key: String, value: f64 },

    /// The dataset provider handed back bytes it could not make sense of.
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Config { field: field.into(), reason: reason.into() }
    }

    pub(crate) fn mismatch(
        stage: &'static str,
        field: impl Into<String>,
        declared: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Error::ConfigMismatch {
            stage,
            field: field.into(),
            declared: declared.to_string(),
            actual: actual.to_string(),
        }
    }
}
