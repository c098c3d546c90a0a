pub mod augment;
pub mod dataset;
pub mod encoder;
pub mod idx;

pub use augment::{binarize, AugmentPolicy, DatasetAugmenter, Split};
pub use dataset::{
    DatasetProvider, Dataset, EncodedDataset, InMemoryDataset, RawImage, RawSplit, Sample,
};
pub use encoder::LabelEncoder;
pub use idx::IdxDataset;
