pub mod builder;
pub mod config;
pub mod network;

pub use builder::{LayerPlan, NetworkBuilder};
pub use config::{ArchitectureConfig, InputShape, LayerConfig, NONE_CLASS};
pub use network::{argmax, Network};
