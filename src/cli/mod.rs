/// CLI Indexes: Pretrained models
pub mod models;

/// Compute device selection
pub mod device;
