use std::sync::Arc;

use burn::{
    data::{
        dataloader::{self, DataLoader, DataLoaderBuilder},
        dataset::InMemDataset,
    },
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;

use crate::utils::tensors::{class_ids, stack_rows};

use super::EncodedItem;

/// An inference batch for text classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Tokenized text as 2D tensor: [batch_size, max_seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask for the tokenized text containing booleans for padding locations
    pub mask_pad: Tensor<B, 2, Bool>,
}

impl<B: Backend> Infer<B> {
    /// Move the batch to the given device
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            tokens: self.tokens.to_device(device),
            mask_pad: self.mask_pad.to_device(device),
        }
    }
}

/// A training batch for text classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Encoder input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Train<B> {
    /// Move the batch to the given device. Called once per batch, at the top of each loop
    /// iteration.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            input: self.input.to_device(device),
            targets: self.targets.to_device(device),
        }
    }

    /// Number of items in the batch
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    /// Whether the batch holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Struct for batching encoded text classification items
#[derive(Clone, new)]
pub struct Batcher<B: Backend> {
    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Collect encoded items into an inference batch
    pub fn infer(&self, items: &[EncodedItem]) -> Infer<B> {
        let seq_length = items.first().map_or(0, |item| item.token_ids.len());

        let tokens = stack_rows::<B>(
            items.iter().map(|item| item.token_ids.as_slice()),
            seq_length,
            &self.device,
        );

        let mask_pad = stack_rows::<B>(
            items.iter().map(|item| item.attention_mask.as_slice()),
            seq_length,
            &self.device,
        )
        .equal_elem(0);

        Infer { tokens, mask_pad }
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend> dataloader::batcher::Batcher<EncodedItem, Train<B>> for Batcher<B> {
    /// Collects a vector of encoded items into a training batch
    fn batch(&self, items: Vec<EncodedItem>) -> Train<B> {
        let input = self.infer(&items);
        let targets = class_ids::<B>(items.iter().map(|item| item.label), &self.device);

        Train { input, targets }
    }
}

/// A data loader yielding batches in a new random order each epoch
pub fn shuffled_loader<B: Backend>(
    items: Vec<EncodedItem>,
    batch_size: usize,
    seed: u64,
    device: B::Device,
) -> Arc<dyn DataLoader<Train<B>>> {
    DataLoaderBuilder::new(Batcher::<B>::new(device))
        .batch_size(batch_size)
        .shuffle(seed)
        .build(InMemDataset::new(items))
}

/// A data loader yielding batches in dataset order
pub fn sequential_loader<B: Backend>(
    items: Vec<EncodedItem>,
    batch_size: usize,
    device: B::Device,
) -> Arc<dyn DataLoader<Train<B>>> {
    DataLoaderBuilder::new(Batcher::<B>::new(device))
        .batch_size(batch_size)
        .build(InMemDataset::new(items))
}

/// Number of batches a partition of `n_items` yields
pub fn n_batches(n_items: usize, batch_size: usize) -> usize {
    n_items.div_ceil(batch_size.max(1))
}
