use tokenizers::{Tokenizer, TruncationParams};

use crate::datasets::spam::Item;

use super::EncodedItem;

/// Encoding Error
#[derive(thiserror::Error, Debug)]
pub enum EncodingError {
    /// The tokenizer rejected its configuration or an input text
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A fixed sequence length of zero cannot hold any token
    #[error("the maximum sequence length must be positive")]
    ZeroLength,
}

/// Turns raw text into fixed-length token id and attention mask sequences
#[derive(Clone)]
pub struct TextEncoder {
    /// Tokenizer for converting text to token IDs
    tokenizer: Tokenizer,

    /// Length of every encoded sequence
    max_seq_length: usize,

    /// ID of the padding token
    pad_token_id: u32,
}

impl TextEncoder {
    /// Wrap a pretrained tokenizer, truncating at `max_seq_length` with special tokens preserved
    pub fn new(
        mut tokenizer: Tokenizer,
        max_seq_length: usize,
        pad_token_id: u32,
    ) -> Result<Self, EncodingError> {
        if max_seq_length == 0 {
            return Err(EncodingError::ZeroLength);
        }

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| EncodingError::Tokenizer(e.to_string()))?;

        // Padding is applied here so the length never depends on the tokenizer's own settings
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            max_seq_length,
            pad_token_id,
        })
    }

    /// Length of every encoded sequence
    pub fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }

    /// Encode a single text with its label
    pub fn encode(&self, text: &str, label: u8) -> Result<EncodedItem, EncodingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EncodingError::Tokenizer(e.to_string()))?;

        let (token_ids, attention_mask) =
            fit_to_length(encoding.get_ids(), self.max_seq_length, self.pad_token_id);

        Ok(EncodedItem::new(token_ids, attention_mask, label))
    }

    /// Encode every item of a partition
    pub fn encode_partition(&self, items: &[Item]) -> Result<Vec<EncodedItem>, EncodingError> {
        items
            .iter()
            .map(|item| self.encode(&item.text, item.label))
            .collect()
    }
}

/// Truncate or pad `ids` to exactly `seq_length` entries, returning the ids with their
/// attention mask
pub fn fit_to_length(ids: &[u32], seq_length: usize, pad_token_id: u32) -> (Vec<u32>, Vec<u32>) {
    let n_tokens = ids.len().min(seq_length);

    let mut token_ids = Vec::with_capacity(seq_length);
    token_ids.extend_from_slice(&ids[..n_tokens]);
    token_ids.resize(seq_length, pad_token_id);

    let mut attention_mask = vec![1; n_tokens];
    attention_mask.resize(seq_length, 0);

    (token_ids, attention_mask)
}
