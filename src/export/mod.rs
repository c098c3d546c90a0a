pub mod examples;
pub mod weights;

pub use examples::{ClassExample, ExampleExporter, ExportedExample};
pub use weights::{Tensor, WeightSerializer, WeightSet};
