use crate::error::Result;
use crate::network::config::InputShape;

/// One grayscale image as delivered by a dataset provider: row-major bytes
/// on the 0–255 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> RawImage {
        RawImage { width, height, pixels }
    }
}

/// Images and their integer labels, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSplit {
    pub images: Vec<RawImage>,
    pub labels: Vec<usize>,
}

impl RawSplit {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Source of the raw `(train, test)` splits.
pub trait DatasetProvider {
    fn load(&self) -> Result<(RawSplit, RawSplit)>;
}

/// Provider over splits already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    pub train: RawSplit,
    pub test: RawSplit,
}

impl DatasetProvider for InMemoryDataset {
    fn load(&self) -> Result<(RawSplit, RawSplit)> {
        Ok((self.train.clone(), self.test.clone()))
    }
}

/// A binarized image with its class index.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Row-major, every value exactly 0.0 or 1.0.
    pub pixels: Vec<f64>,
    pub label: usize,
}

/// Binarized split with the synthetic "none" samples appended after the
/// real ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub shape: InputShape,
    pub samples: Vec<Sample>,
    /// How many of the trailing samples are synthetic.
    pub synthetic: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples that came from the provider.
    pub fn real_samples(&self) -> &[Sample] {
        &self.samples[..self.samples.len() - self.synthetic]
    }

    pub fn synthetic_samples(&self) -> &[Sample] {
        &self.samples[self.samples.len() - self.synthetic..]
    }
}

/// Split ready for training: flat inputs and one-hot targets.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub shape: InputShape,
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<Vec<f64>>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Reshapes a row-major pixel vector into `height` rows of `width`.
pub fn to_grid(pixels: &[f64], shape: InputShape) -> Vec<Vec<f64>> {
    pixels.chunks(shape.width.max(1)).take(shape.height).map(|r| r.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_row_major() {
        let shape = InputShape { width: 3, height: 2 };
        let grid = to_grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], shape);
        assert_eq!(grid, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn real_and_synthetic_partition() {
        let sample = |label| Sample { pixels: vec![0.0], label };
        let ds = Dataset {
            shape: InputShape { width: 1, height: 1 },
            samples: vec![sample(0), sample(1), sample(2)],
            synthetic: 1,
        };
        assert_eq!(ds.real_samples().len(), 2);
        assert_eq!(ds.synthetic_samples()[0].label, 2);
    }
}
