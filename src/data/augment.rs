use log::info;

use crate::data::dataset::{Dataset, RawSplit, Sample};
use crate::error::{Error, Result};
use crate::network::config::ArchitectureConfig;

/// Binarization threshold on the original 0–255 scale.
pub const BINARIZE_THRESHOLD: f64 = 127.5;

/// Synthetic "none" samples appended to the training split.
pub const TRAIN_SYNTHETIC: usize = 5000;
/// Synthetic "none" samples appended to the test split.
pub const TEST_SYNTHETIC: usize = 1000;

/// Maps a normalized pixel (0–255 scaled to [0, 1]) to exactly 0.0 or 1.0.
///
/// Idempotent: 0.0 and 1.0 map to themselves.
pub fn binarize(p: f64) -> f64 {
    if p > BINARIZE_THRESHOLD / 255.0 { 1.0 } else { 0.0 }
}

/// Binarizes a raw byte pixel.
pub fn binarize_byte(p: u8) -> f64 {
    if p as f64 > BINARIZE_THRESHOLD { 1.0 } else { 0.0 }
}

/// Which split a dataset is; decides the synthetic sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// How many all-zero "none" samples each split receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AugmentPolicy {
    pub train_synthetic: usize,
    pub test_synthetic: usize,
}

impl Default for AugmentPolicy {
    fn default() -> Self {
        AugmentPolicy { train_synthetic: TRAIN_SYNTHETIC, test_synthetic: TEST_SYNTHETIC }
    }
}

impl AugmentPolicy {
    pub fn synthetic_for(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train_synthetic,
            Split::Test => self.test_synthetic,
        }
    }
}

/// Binarizes raw splits and appends the synthetic rejection class.
pub struct DatasetAugmenter<'a> {
    config: &'a ArchitectureConfig,
    policy: AugmentPolicy,
}

impl<'a> DatasetAugmenter<'a> {
    pub fn new(config: &'a ArchitectureConfig, policy: AugmentPolicy) -> Self {
        DatasetAugmenter { config, policy }
    }

    /// Produces the augmented dataset for one split.
    ///
    /// Real samples keep their order; the synthetic samples, all labeled
    /// `classes.len() - 1`, follow them. The input split is not modified.
    pub fn augment(&self, raw: &RawSplit, split: Split) -> Result<Dataset> {
        let shape = self.config.input;
        let none = self.config.none_index();

        if raw.images.len() != raw.labels.len() {
            return Err(Error::Dataset(format!(
                "{:?} split has {} images but {} labels",
                split, raw.images.len(), raw.labels.len()
            )));
        }

        let synthetic = self.policy.synthetic_for(split);
        let mut samples = Vec::with_capacity(raw.len() + synthetic);

        for (i, (image, &label)) in raw.images.iter().zip(raw.labels.iter()).enumerate() {
            if image.width != shape.width {
                return Err(Error::mismatch("augment", "input.width", shape.width, image.width));
            }
            if image.height != shape.height {
                return Err(Error::mismatch("augment", "input.height", shape.height, image.height));
            }
            if image.pixels.len() != shape.len() {
                return Err(Error::mismatch(
                    "augment",
                    format!("image {i} pixel count"),
                    shape.len(),
                    image.pixels.len(),
                ));
            }
            // the "none" index belongs to the synthetic class only
            if label >= none {
                return Err(Error::LabelRange { stage: "augment", sample: i, label, limit: none });
            }

            samples.push(Sample {
                pixels: image.pixels.iter().map(|&p| binarize_byte(p)).collect(),
                label,
            });
        }

        samples.extend((0..synthetic).map(|_| Sample { pixels: vec![0.0; shape.len()], label: none }));

        info!(
            "{:?} split: {} real + {} synthetic \"{}\" samples",
            split, raw.len(), synthetic, self.config.class_name(none)
        );

        Ok(Dataset { shape, samples, synthetic })
    }

    /// Augments `(train, test)` in one call.
    pub fn augment_splits(&self, train: &RawSplit, test: &RawSplit) -> Result<(Dataset, Dataset)> {
        Ok((self.augment(train, Split::Train)?, self.augment(test, Split::Test)?))
    }
}
