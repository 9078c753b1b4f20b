use std::path::PathBuf;

use anyhow::Context;
use hf_hub::api::tokio;

/// Download model config and weights from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
// NOTE: Modified from the built-in function to work within an already-async context
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<(PathBuf, PathBuf)> {
    let api = tokio::Api::new().context("Unable to reach the Hugging Face Hub")?;
    let repo = api.model(model_name.to_string());

    let model_filepath = repo.get("model.safetensors").await.with_context(|| {
        format!(
            "Failed to download: {} weights with name: model.safetensors from HuggingFace Hub",
            model_name
        )
    })?;

    let config_filepath = repo.get("config.json").await.with_context(|| {
        format!(
            "Failed to download: {} config with name: config.json from HuggingFace Hub",
            model_name
        )
    })?;

    Ok((config_filepath, model_filepath))
}

/// Download the tokenizer definition from Hugging Face Hub, with the same caching
pub async fn download_hf_tokenizer(model_name: &str) -> anyhow::Result<PathBuf> {
    let api = tokio::Api::new().context("Unable to reach the Hugging Face Hub")?;

    api.model(model_name.to_string())
        .get("tokenizer.json")
        .await
        .with_context(|| {
            format!(
                "Failed to download: {} tokenizer with name: tokenizer.json from HuggingFace Hub",
                model_name
            )
        })
}
