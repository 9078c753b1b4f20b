//! # Spam Finetune
//!
//! Fine-tunes a small classification head on top of a frozen pretrained BERT or RoBERTa
//! encoder to tell spam from ham, then reports precision, recall and F1 on a held-out test
//! partition.
#![forbid(unsafe_code)]

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

/// Error macros
#[macro_use]
extern crate anyhow;
