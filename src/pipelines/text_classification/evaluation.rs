use std::sync::Arc;

use burn::{data::dataloader::DataLoader, module::Module, tensor::backend::Backend};

use super::{
    batcher::Train,
    checkpoint::{Checkpoint, CheckpointError},
    model::Classifier,
};

/// True and predicted class ids for a partition, in loader order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predictions {
    /// Labels from the dataset
    pub targets: Vec<usize>,

    /// Arg-max of the model's log-probabilities
    pub predicted: Vec<usize>,
}

impl Predictions {
    /// Number of predicted items
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing was predicted
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Predict every batch of `loader` with `model` as it is
pub fn predict<B: Backend, M: Classifier<B>>(
    model: &M,
    loader: &Arc<dyn DataLoader<Train<B>>>,
    device: &B::Device,
) -> Predictions {
    let mut predictions = Predictions::default();

    for batch in loader.iter() {
        let batch = batch.to_device(device);

        predictions.targets.extend(
            batch
                .targets
                .into_data()
                .convert::<i64>()
                .value
                .into_iter()
                .map(|class| class as usize),
        );
        predictions.predicted.extend(model.predict(batch.input));
    }

    predictions
}

/// Reload the best checkpoint into `model` and predict the test partition with it
pub fn evaluate<B: Backend, M: Module<B> + Classifier<B>>(
    model: M,
    checkpoint: &Checkpoint,
    loader: &Arc<dyn DataLoader<Train<B>>>,
    device: &B::Device,
) -> Result<Predictions, CheckpointError> {
    if let Some(epoch) = checkpoint.best_epoch() {
        log::info!(
            "Evaluating the checkpoint from epoch {} (validation loss {:.4})",
            epoch,
            checkpoint.best_loss()
        );
    }

    let model = checkpoint.load::<B, M>(model, device)?;

    Ok(predict(&model, loader, device))
}
