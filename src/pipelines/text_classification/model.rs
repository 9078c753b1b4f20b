use burn::tensor::{backend::Backend, Tensor};

use super::batcher::Infer;

/// A model that produces class log-probabilities from token ids and a padding mask.
///
/// The training loop and the evaluator only depend on this capability, so any encoder and
/// head combination satisfying it can be substituted.
pub trait Classifier<B: Backend> {
    /// Log-probabilities as a `[batch_size, n_classes]` tensor
    fn log_probs(&self, input: Infer<B>) -> Tensor<B, 2>;

    /// Predicted class id for each item of the batch
    fn predict(&self, input: Infer<B>) -> Vec<usize> {
        let log_probs = self.log_probs(input);
        let [batch_size, _n_classes] = log_probs.dims();

        log_probs
            .argmax(1)
            .reshape([batch_size])
            .into_data()
            .convert::<i64>()
            .value
            .into_iter()
            .map(|class| class as usize)
            .collect()
    }
}
