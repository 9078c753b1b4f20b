use std::path::PathBuf;

use anyhow::Context;
use burn::{
    config::Config as _, module::AutodiffModule, optim::AdamWConfig,
    tensor::backend::AutodiffBackend,
};

use crate::datasets::{
    spam::{Item, LABELS},
    split::Partitions,
};

use super::{
    batcher::{n_batches, sequential_loader, shuffled_loader},
    checkpoint::Checkpoint,
    encoding::TextEncoder,
    evaluation::evaluate,
    loss::{class_weights, WeightedNllLoss},
    model::Classifier,
    report::{append_results, ClassificationReport, ConfusionMatrix},
    training::{Config, History, Loaders, TrainingContext},
};

/// Where a run writes its outputs
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Directory holding the checkpoint and its config
    pub dir: PathBuf,

    /// Append-only results file
    pub results: PathBuf,
}

impl Artifacts {
    /// Create a new set of artifact locations
    pub fn new(dir: impl Into<PathBuf>, results: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            results: results.into(),
        }
    }

    /// The best-model checkpoint for `model_name`
    pub fn checkpoint(&self, model_name: &str) -> Checkpoint {
        Checkpoint::for_model(&self.dir, model_name)
    }

    /// The saved training config, next to the checkpoint
    pub fn config_path(&self, model_name: &str) -> PathBuf {
        let mut path = self.checkpoint(model_name).stem().to_path_buf().into_os_string();
        path.push(".json");

        path.into()
    }
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct Summary {
    /// Per-epoch losses
    pub history: History,

    /// Test-set metrics of the best checkpoint
    pub report: ClassificationReport,

    /// Test-set confusion matrix of the best checkpoint
    pub confusion: ConfusionMatrix,

    /// The checkpoint file that was evaluated
    pub checkpoint: PathBuf,
}

fn labels(items: &[Item]) -> Vec<u8> {
    items.iter().map(|item| item.label).collect()
}

/// Train `model` on the training partition, keep the checkpoint with the lowest validation
/// loss, evaluate it on the test partition and append the report to the results file.
pub async fn run<B, M>(
    device: B::Device,
    model: M,
    encoder: &TextEncoder,
    partitions: &Partitions,
    config: &Config,
    artifacts: &Artifacts,
) -> anyhow::Result<Summary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
{
    config.validate()?;

    let train = encoder.encode_partition(&partitions.train)?;
    let validation = encoder.encode_partition(&partitions.validation)?;
    let test = encoder.encode_partition(&partitions.test)?;

    let weights = class_weights(&labels(&partitions.train), LABELS.len())?;
    log::info!("Class weights {:?} for {:?}", weights, LABELS);

    let loaders = Loaders {
        n_train_batches: n_batches(train.len(), config.batch_size),
        train: shuffled_loader::<B>(train, config.batch_size, config.seed, device.clone()),
        n_valid_batches: n_batches(validation.len(), config.batch_size),
        valid: sequential_loader::<B::InnerBackend>(validation, config.batch_size, device.clone()),
    };
    let test_loader = sequential_loader::<B::InnerBackend>(test, config.batch_size, device.clone());

    tokio::fs::create_dir_all(&artifacts.dir)
        .await
        .with_context(|| format!("Unable to create {}", artifacts.dir.display()))?;

    let config_path = artifacts.config_path(&config.model_name);
    config
        .save(&config_path)
        .with_context(|| format!("Unable to save config to {}", config_path.display()))?;

    let optimizer = AdamWConfig::new()
        .with_epsilon(config.adam_epsilon)
        .with_weight_decay(0.0)
        .init::<B, M>();

    let mut checkpoint = artifacts.checkpoint(&config.model_name);

    let context = TrainingContext::new(
        model,
        optimizer,
        WeightedNllLoss::new(weights),
        device.clone(),
        config.learning_rate,
        config.max_grad_norm,
    );

    let (model, history) = context.fit(&loaders, &mut checkpoint, config.num_epochs)?;

    if let Some(best) = history.best() {
        log::info!(
            "Best validation loss {:.3} at epoch {} of {}",
            best.valid_loss,
            best.epoch,
            history.epochs().len()
        );
    }

    let predictions =
        evaluate::<B::InnerBackend, _>(model.valid(), &checkpoint, &test_loader, &device)?;

    let report = ClassificationReport::new(&predictions.targets, &predictions.predicted, &LABELS);
    let confusion = ConfusionMatrix::new(&predictions.targets, &predictions.predicted, &LABELS);

    log::info!("Confusion matrix:\n{}", confusion);
    log::info!("Test report:\n{}", report);

    append_results(&artifacts.results, &config.model_name, &report)
        .await
        .with_context(|| format!("Unable to append to {}", artifacts.results.display()))?;

    Ok(Summary {
        history,
        report,
        confusion,
        checkpoint: checkpoint.file_path(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn places_config_next_to_checkpoint() {
        let artifacts = Artifacts::new("runs", "result.txt");

        assert_eq!(
            artifacts.config_path("roberta-base"),
            PathBuf::from("runs/saved_roberta-base.json")
        );
        assert_eq!(
            artifacts.checkpoint("roberta-base").file_path(),
            PathBuf::from("runs/saved_roberta-base.mpk")
        );
    }
}
