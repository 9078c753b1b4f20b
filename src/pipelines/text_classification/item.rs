use derive_new::new;
use serde::{Deserialize, Serialize};

/// A tokenized message, ready to be batched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct EncodedItem {
    /// Token ids, padded or truncated to the configured sequence length
    pub token_ids: Vec<u32>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u32>,

    /// Class id of the message
    pub label: u8,
}

impl EncodedItem {
    /// The number of non-padding tokens
    pub fn n_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}
