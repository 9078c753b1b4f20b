use std::path::PathBuf;

use bert_burn::{
    data::BertInferenceBatch,
    model::{BertModel, BertModelOutput},
};
use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    pipelines::text_classification::{batcher::Infer, head::Head, model::Classifier, training},
    utils::hugging_face::{download_hf_model, download_hf_tokenizer},
};

use super::Config;

/// A frozen pretrained BERT/RoBERTa encoder topped with a trainable classification head
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// The base BERT model, excluded from gradient updates
    pub encoder: BertModel<B>,

    /// Maps the sentence representation to class log-probabilities
    pub head: Head<B>,
}

impl<B: Backend> Model<B> {
    /// Load the pretrained encoder weights and freeze them. The head starts from random weights.
    pub fn from_safetensors(device: &B::Device, weights_file: PathBuf, config: &Config) -> Self {
        let record = BertModel::from_safetensors(weights_file, device, config.encoder.clone());

        let model = config.init(device);

        Self {
            encoder: model.encoder.load_record(record).no_grad(),
            head: model.head,
        }
    }

    /// ID of the padding token the encoder was trained with
    pub fn pad_token_id(&self) -> usize {
        self.encoder.embeddings.pad_token_idx
    }
}

impl<B: Backend> Classifier<B> for Model<B> {
    fn log_probs(&self, input: Infer<B>) -> Tensor<B, 2> {
        let [batch_size, _seq_length] = input.tokens.dims();

        let BertModelOutput {
            pooled_output,
            hidden_states,
        } = self.encoder.forward(BertInferenceBatch {
            tokens: input.tokens,
            mask_pad: input.mask_pad,
        });

        let states = pooled_output.unwrap_or(hidden_states);
        let [_, _, d_model] = states.dims();

        // First-token representation
        let sentence = states
            .slice([0..batch_size, 0..1])
            .reshape([batch_size, d_model]);

        self.head.forward(sentence)
    }
}

/// Everything fetched from the Hugging Face Hub for one model id
#[derive(Clone)]
pub struct Pretrained {
    /// Model configuration
    pub config: Config,

    /// `tokenizer.json`
    pub tokenizer_file: PathBuf,

    /// `model.safetensors`
    pub weights_file: PathBuf,
}

/// Download (or reuse from the local cache) the files of `model_name` and build its config
pub async fn from_pretrained(
    model_name: &str,
    training: &training::Config,
) -> anyhow::Result<Pretrained> {
    let (config_file, weights_file) = download_hf_model(model_name).await?;
    let tokenizer_file = download_hf_tokenizer(model_name).await?;

    let config = Config::load_pretrained(config_file, training)?;

    Ok(Pretrained {
        config,
        tokenizer_file,
        weights_file,
    })
}
