use crate::data::dataset::{Dataset, EncodedDataset};
use crate::error::{Error, Result};

/// One-hot encodes class indices against a fixed class count.
#[derive(Debug, Clone, Copy)]
pub struct LabelEncoder {
    num_classes: usize,
}

impl LabelEncoder {
    /// `num_classes` includes the synthetic "none" class.
    pub fn new(num_classes: usize) -> Self {
        LabelEncoder { num_classes }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// One-hot vector for `label`; `sample` only labels the error.
    pub fn one_hot(&self, label: usize, sample: usize) -> Result<Vec<f64>> {
        if label >= self.num_classes {
            return Err(Error::LabelRange { stage: "encode", sample, label, limit: self.num_classes });
        }
        let mut v = vec![0.0; self.num_classes];
        v[label] = 1.0;
        Ok(v)
    }

    /// Encodes every sample, keeping order.
    pub fn encode(&self, dataset: &Dataset) -> Result<EncodedDataset> {
        let labels = dataset.samples
            .iter()
            .enumerate()
            .map(|(i, s)| self.one_hot(s.label, i))
            .collect::<Result<Vec<_>>>()?;
        let inputs = dataset.samples.iter().map(|s| s.pixels.clone()).collect();

        Ok(EncodedDataset { shape: dataset.shape, inputs, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Sample;
    use crate::network::config::InputShape;

    fn dataset(labels: &[usize]) -> Dataset {
        Dataset {
            shape: InputShape { width: 1, height: 2 },
            samples: labels.iter().map(|&label| Sample { pixels: vec![1.0, 0.0], label }).collect(),
            synthetic: 0,
        }
    }

    #[test]
    fn every_label_is_one_hot() {
        let encoder = LabelEncoder::new(4);
        let encoded = encoder.encode(&dataset(&[0, 3, 2, 3])).unwrap();
        assert_eq!(encoded.len(), 4);
        for (label, v) in [0usize, 3, 2, 3].iter().zip(encoded.labels.iter()) {
            assert_eq!(v.len(), 4);
            assert_eq!(v.iter().sum::<f64>(), 1.0);
            assert_eq!(v[*label], 1.0);
        }
        assert_eq!(encoded.inputs[0], vec![1.0, 0.0]);
    }

    #[test]
    fn out_of_range_label_names_the_sample() {
        let encoder = LabelEncoder::new(3);
        match encoder.encode(&dataset(&[0, 1, 3])) {
            Err(Error::LabelRange { sample, label, limit, .. }) => {
                assert_eq!((sample, label, limit), (2, 3, 3));
            }
            other => panic!("expected LabelRange, got {:?}", other),
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let encoder = LabelEncoder::new(3);
        let ds = dataset(&[2, 1, 0]);
        assert_eq!(encoder.encode(&ds).unwrap(), encoder.encode(&ds).unwrap());
    }
}
