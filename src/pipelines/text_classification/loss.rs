use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Loss Error
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LossError {
    /// A class has no training examples, so its inverse frequency is undefined
    #[error("class {0} has no training examples")]
    MissingClass(usize),
}

/// Inverse-frequency ("balanced") class weights: `n_total / (n_classes * n_class)`
pub fn class_weights(labels: &[u8], n_classes: usize) -> Result<Vec<f32>, LossError> {
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        if let Some(count) = counts.get_mut(label as usize) {
            *count += 1;
        }
    }

    let total = labels.len() as f32;

    counts
        .iter()
        .enumerate()
        .map(|(class, &count)| {
            if count == 0 {
                Err(LossError::MissingClass(class))
            } else {
                Ok(total / (n_classes as f32 * count as f32))
            }
        })
        .collect()
}

/// Negative log-likelihood over log-probabilities, weighted per target class and averaged
/// by the sum of the applied weights
#[derive(Clone, Debug)]
pub struct WeightedNllLoss {
    weights: Vec<f32>,
}

impl WeightedNllLoss {
    /// Create the loss from one weight per class
    pub fn new(weights: Vec<f32>) -> Self {
        Self { weights }
    }

    /// The class weights
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Compute the loss of `[batch_size, n_classes]` log-probabilities against class ids
    pub fn forward<B: Backend>(
        &self,
        log_probs: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let [batch_size, n_classes] = log_probs.dims();
        debug_assert_eq!(n_classes, self.weights.len());

        let device = log_probs.device();
        let weights: Vec<B::FloatElem> = self.weights.iter().map(|&w| w.elem()).collect();
        let weights = Tensor::<B, 1>::from_data(
            Data::new(weights, Shape::new([self.weights.len()])),
            &device,
        );

        let sample_weights = weights.select(0, targets.clone());
        let picked = log_probs
            .gather(1, targets.reshape([batch_size, 1]))
            .reshape([batch_size]);

        (picked * sample_weights.clone()).sum().neg() / sample_weights.sum()
    }
}
