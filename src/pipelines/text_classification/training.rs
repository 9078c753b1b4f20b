use std::{fmt, sync::Arc};

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
    LearningRate,
};

use super::{
    batcher::Train,
    checkpoint::{Checkpoint, CheckpointError},
    clipping::clip_grad_norm,
    loss::WeightedNllLoss,
    model::Classifier,
};

/// Progress is logged every this many batches
const LOG_EVERY: usize = 50;

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Config {
    /// Model name (e.g., "roberta-base")
    #[config(default = "\"roberta-base\".to_string()")]
    pub model_name: String,

    /// Maximum sequence length
    #[config(default = 25)]
    pub max_seq_length: usize,

    /// Batch size
    #[config(default = 32)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 10)]
    pub num_epochs: usize,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// Learning rate
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// Ceiling for the global gradient norm
    #[config(default = 1.0)]
    pub max_grad_norm: f64,

    /// Width of the head's hidden layer
    #[config(default = 512)]
    pub head_hidden_size: usize,

    /// Dropout rate inside the head
    #[config(default = 0.1)]
    pub head_dropout: f64,

    /// Seed for the data loaders and the backend
    #[config(default = 2018)]
    pub seed: u64,
}

/// Which pass of an epoch was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Gradient updates on the training partition
    Training,

    /// Loss measurement on the validation partition
    Validation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Training => write!(f, "training"),
            Phase::Validation => write!(f, "validation"),
        }
    }
}

/// Training Error
#[derive(thiserror::Error, Debug)]
pub enum TrainingError {
    /// The loss diverged
    #[error("non-finite {phase} loss at epoch {epoch}, batch {batch}")]
    NonFiniteLoss {
        /// 1-based epoch
        epoch: usize,
        /// 1-based batch within the epoch
        batch: usize,
        /// Pass that produced the loss
        phase: Phase,
    },

    /// A partition yielded no batches
    #[error("the {0} partition is empty")]
    EmptyPartition(Phase),

    /// The best-model snapshot could not be written
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A hyperparameter that must be strictly positive is not
    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

impl Config {
    /// Reject settings that cannot produce a trained checkpoint
    pub fn validate(&self) -> Result<(), TrainingError> {
        let checks = [
            ("num_epochs", self.num_epochs > 0),
            ("batch_size", self.batch_size > 0),
            ("max_seq_length", self.max_seq_length > 0),
            ("learning_rate", self.learning_rate > 0.0),
            ("max_grad_norm", self.max_grad_norm > 0.0),
        ];

        match checks.iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(TrainingError::NonPositive(*field)),
            None => Ok(()),
        }
    }
}

/// Loss summary of one epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    /// 1-based epoch
    pub epoch: usize,

    /// Mean training loss over the epoch's batches
    pub train_loss: f64,

    /// Mean validation loss over the epoch's batches
    pub valid_loss: f64,

    /// Whether this epoch rewrote the checkpoint
    pub improved: bool,
}

/// Per-epoch losses of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    epochs: Vec<EpochStats>,
}

impl History {
    /// Record an epoch
    pub fn push(&mut self, stats: EpochStats) {
        self.epochs.push(stats);
    }

    /// All recorded epochs in order
    pub fn epochs(&self) -> &[EpochStats] {
        &self.epochs
    }

    /// The epoch with the lowest validation loss; ties go to the earliest
    pub fn best(&self) -> Option<&EpochStats> {
        self.epochs.iter().rev().find(|stats| stats.improved)
    }
}

/// Training and validation loaders with their batch counts
pub struct Loaders<B: AutodiffBackend> {
    /// Shuffled training batches
    pub train: Arc<dyn DataLoader<Train<B>>>,

    /// Number of training batches per epoch
    pub n_train_batches: usize,

    /// Validation batches, without autodiff
    pub valid: Arc<dyn DataLoader<Train<B::InnerBackend>>>,

    /// Number of validation batches per epoch
    pub n_valid_batches: usize,
}

/// Everything the epoch loop mutates: the model, its optimizer and the loss
pub struct TrainingContext<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    model: M,
    optimizer: O,
    loss: WeightedNllLoss,
    device: B::Device,
    learning_rate: LearningRate,
    max_grad_norm: f64,
}

impl<B, M, O> TrainingContext<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    /// Create a new training context
    pub fn new(
        model: M,
        optimizer: O,
        loss: WeightedNllLoss,
        device: B::Device,
        learning_rate: LearningRate,
        max_grad_norm: f64,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss,
            device,
            learning_rate,
            max_grad_norm,
        }
    }

    /// The model in its current state
    pub fn model(&self) -> &M {
        &self.model
    }

    /// One pass over the training partition. Returns the mean batch loss.
    pub fn train_epoch(
        &mut self,
        epoch: usize,
        loader: &Arc<dyn DataLoader<Train<B>>>,
        n_batches: usize,
    ) -> Result<f64, TrainingError> {
        let mut total = 0.0;
        let mut seen = 0;

        for (step, batch) in loader.iter().enumerate() {
            if step % LOG_EVERY == 0 && step != 0 {
                log::info!("  Batch {:>5} of {:>5}.", step, n_batches);
            }

            let batch = batch.to_device(&self.device);

            let log_probs = self.model.log_probs(batch.input);
            let loss = self.loss.forward(log_probs, batch.targets);

            let value = loss.clone().into_scalar().elem::<f64>();
            if !value.is_finite() {
                return Err(TrainingError::NonFiniteLoss {
                    epoch,
                    batch: step + 1,
                    phase: Phase::Training,
                });
            }

            let mut grads = GradientsParams::from_grads(loss.backward(), &self.model);
            let norm = clip_grad_norm::<B, M>(&self.model, &mut grads, self.max_grad_norm);
            log::debug!("Batch {} gradient norm {:.4}", step + 1, norm);

            self.model = self
                .optimizer
                .step(self.learning_rate, self.model.clone(), grads);

            total += value;
            seen += 1;
        }

        if seen == 0 {
            return Err(TrainingError::EmptyPartition(Phase::Training));
        }

        Ok(total / seen as f64)
    }

    /// One pass over the validation partition without gradient tracking. Returns the mean
    /// batch loss.
    pub fn valid_epoch(
        &self,
        epoch: usize,
        loader: &Arc<dyn DataLoader<Train<B::InnerBackend>>>,
        n_batches: usize,
    ) -> Result<f64, TrainingError> {
        let model = self.model.valid();
        let device = self.device.clone();

        let mut total = 0.0;
        let mut seen = 0;

        for (step, batch) in loader.iter().enumerate() {
            if step % LOG_EVERY == 0 && step != 0 {
                log::info!("  Batch {:>5} of {:>5}.", step, n_batches);
            }

            let batch = batch.to_device(&device);

            let log_probs = model.log_probs(batch.input);
            let value = self
                .loss
                .forward(log_probs, batch.targets)
                .into_scalar()
                .elem::<f64>();

            if !value.is_finite() {
                return Err(TrainingError::NonFiniteLoss {
                    epoch,
                    batch: step + 1,
                    phase: Phase::Validation,
                });
            }

            total += value;
            seen += 1;
        }

        if seen == 0 {
            return Err(TrainingError::EmptyPartition(Phase::Validation));
        }

        Ok(total / seen as f64)
    }

    /// Run `num_epochs` epochs, rewriting `checkpoint` whenever the validation loss strictly
    /// improves. Returns the final model along with the per-epoch history.
    pub fn fit(
        mut self,
        loaders: &Loaders<B>,
        checkpoint: &mut Checkpoint,
        num_epochs: usize,
    ) -> Result<(M, History), TrainingError> {
        if num_epochs == 0 {
            return Err(TrainingError::NonPositive("num_epochs"));
        }

        let mut history = History::default();

        for epoch in 1..=num_epochs {
            log::info!("Epoch {} / {}", epoch, num_epochs);

            let train_loss = self.train_epoch(epoch, &loaders.train, loaders.n_train_batches)?;

            log::info!("Evaluating...");
            let valid_loss = self.valid_epoch(epoch, &loaders.valid, loaders.n_valid_batches)?;

            let improved =
                checkpoint.consider::<B::InnerBackend, _>(epoch, valid_loss, &self.model.valid())?;

            log::info!("Training Loss: {:.3}", train_loss);
            log::info!("Validation Loss: {:.3}", valid_loss);

            history.push(EpochStats {
                epoch,
                train_loss,
                valid_loss,
                improved,
            });
        }

        Ok((self.model, history))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn stats(epoch: usize, valid_loss: f64, improved: bool) -> EpochStats {
        EpochStats {
            epoch,
            train_loss: 1.0,
            valid_loss,
            improved,
        }
    }

    #[test]
    fn best_epoch_is_the_last_improvement() {
        let mut history = History::default();
        history.push(stats(1, 0.9, true));
        history.push(stats(2, 0.7, true));
        history.push(stats(3, 0.8, false));
        history.push(stats(4, 0.7, false));

        assert_eq!(history.best().map(|stats| stats.epoch), Some(2));
        assert_eq!(history.epochs().len(), 4);
    }

    #[test]
    fn empty_history_has_no_best_epoch() {
        assert_eq!(History::default().best(), None);
    }

    #[test]
    fn has_documented_defaults() {
        let config = Config::new();

        assert_eq!(config.model_name, "roberta-base");
        assert_eq!(config.max_seq_length, 25);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.num_epochs, 10);
        assert_eq!(config.seed, 2018);
        assert!((config.learning_rate - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_epochs_and_batch_size() {
        assert!(Config::new().validate().is_ok());

        assert!(matches!(
            Config::new().with_num_epochs(0).validate(),
            Err(TrainingError::NonPositive("num_epochs"))
        ));
        assert!(matches!(
            Config::new().with_batch_size(0).validate(),
            Err(TrainingError::NonPositive("batch_size"))
        ));
        assert!(matches!(
            Config::new().with_learning_rate(0.0).validate(),
            Err(TrainingError::NonPositive("learning_rate"))
        ));
    }

    #[test]
    fn describes_non_finite_losses() {
        let error = TrainingError::NonFiniteLoss {
            epoch: 2,
            batch: 7,
            phase: Phase::Validation,
        };

        assert_eq!(
            error.to_string(),
            "non-finite validation loss at epoch 2, batch 7"
        );
    }
}
