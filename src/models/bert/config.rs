use std::path::PathBuf;

use bert_burn::model::BertModelConfig;
use burn::{config::Config as _, tensor::backend::Backend};

use crate::pipelines::text_classification::{head::HeadConfig, training};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// The pretrained encoder, as read from the Hugging Face `config.json`
    pub encoder: BertModelConfig,

    /// The trainable classification head
    pub head: HeadConfig,
}

impl Config {
    /// Read a Hugging Face encoder config and size the head to fit it
    pub fn load_pretrained(
        config_file: PathBuf,
        training: &training::Config,
    ) -> anyhow::Result<Self> {
        let encoder = BertModelConfig::load(&config_file)
            .map_err(|e| anyhow!("Unable to load Hugging Face Config file: {}", e))?
            // The classifier reads the pooled first-token representation
            .with_with_pooling_layer(Some(true));

        let head = HeadConfig::new(encoder.hidden_size)
            .with_d_hidden(training.head_hidden_size)
            .with_dropout(training.head_dropout);

        Ok(Config::new(encoder, head))
    }

    /// Initialize a model with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        Model {
            encoder: self.encoder.init(device),
            head: self.head.init(device),
        }
    }
}
