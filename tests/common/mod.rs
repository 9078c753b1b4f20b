#![allow(dead_code)]

use std::{path::PathBuf, str::FromStr};

use burn::{
    backend::{Autodiff, NdArray},
    module::Module,
    nn::{Embedding, EmbeddingConfig},
    tensor::{backend::Backend, Tensor},
};
use spam_finetune::{
    datasets::spam::{Item, HAM, SPAM},
    pipelines::text_classification::{
        batcher::Infer,
        head::{Head, HeadConfig},
        Classifier, TextEncoder,
    },
};
use tokenizers::Tokenizer;

pub type TestBackend = Autodiff<NdArray>;

pub const TOKENIZER: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": {"type": "Lowercase"},
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {"[PAD]": 0, "[UNK]": 1, "free": 2, "prize": 3, "call": 4, "now": 5, "see": 6, "you": 7},
        "unk_token": "[UNK]"
    }
}"#;

pub const VOCAB_SIZE: usize = 8;

pub const MAX_SEQ_LENGTH: usize = 8;

/// A tiny stand-in for a pretrained encoder: mean of token embeddings fed to the head
#[derive(Module, Debug)]
pub struct BagOfWords<B: Backend> {
    pub embedding: Embedding<B>,
    pub head: Head<B>,
}

impl<B: Backend> BagOfWords<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(VOCAB_SIZE, 8).init(device),
            head: HeadConfig::new(8).with_d_hidden(16).init(device),
        }
    }
}

impl<B: Backend> Classifier<B> for BagOfWords<B> {
    fn log_probs(&self, input: Infer<B>) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = input.tokens.dims();

        let embedded = self.embedding.forward(input.tokens);
        let [_, _, d_model] = embedded.dims();

        self.head
            .forward(embedded.mean_dim(1).reshape([batch_size, d_model]))
    }
}

pub fn encoder() -> TextEncoder {
    let tokenizer = Tokenizer::from_str(TOKENIZER).expect("tokenizer json");

    TextEncoder::new(tokenizer, MAX_SEQ_LENGTH, 0).expect("encoder")
}

/// `n_ham` harmless and `n_spam` spammy messages, ham first
pub fn dataset(n_ham: usize, n_spam: usize) -> Vec<Item> {
    let ham = (0..n_ham).map(|i| Item::new(format!("see you now {}", i), HAM));
    let spam = (0..n_spam).map(|i| Item::new(format!("FREE prize call now {}", i), SPAM));

    ham.chain(spam).collect()
}

/// A fresh, empty directory for one test
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spam-finetune-{}-{}", name, std::process::id()));

    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir");

    dir
}
