/// The classifier capability shared by every model the pipeline can train
pub mod model;

/// Classification head
pub mod head;

/// Batcher
pub mod batcher;

/// Text Classification Items
pub mod item;

/// Tokenization to fixed-length sequences
pub mod encoding;

/// Class-weighted loss
pub mod loss;

/// Gradient clipping
pub mod clipping;

/// Best-model checkpointing
pub mod checkpoint;

/// Training
pub mod training;

/// Evaluation on the test partition
pub mod evaluation;

/// Classification metrics and the results file
pub mod report;

/// The end-to-end run
pub mod pipeline;

pub use batcher::Batcher;
pub use checkpoint::Checkpoint;
pub use encoding::TextEncoder;
pub use item::EncodedItem;
pub use model::Classifier;
pub use pipeline::{run, Artifacts, Summary};
pub use training::{Config, TrainingContext};
