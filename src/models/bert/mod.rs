/// BERT Spam Classifier Configuration
pub mod config;

/// BERT Spam Classifier
pub mod model;

pub use config::Config;
pub use model::{from_pretrained, Model, ModelRecord, Pretrained};
