use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    tensor::{
        activation::{log_softmax, relu},
        backend::Backend,
        Tensor,
    },
};

/// Configuration of the trainable classification head
#[derive(Config)]
pub struct HeadConfig {
    /// Size of the sentence representation produced by the encoder (e.g., 768 for roberta-base)
    pub d_input: usize,

    /// Size of the hidden projection
    #[config(default = 512)]
    pub d_hidden: usize,

    /// Number of output classes
    #[config(default = 2)]
    pub n_classes: usize,

    /// Dropout rate between the two projections
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl HeadConfig {
    /// Initialize a head with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Head<B> {
        Head {
            hidden: LinearConfig::new(self.d_input, self.d_hidden).init(device),
            output: LinearConfig::new(self.d_hidden, self.n_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Two-layer projection from a sentence representation to class log-probabilities
#[derive(Module, Debug)]
pub struct Head<B: Backend> {
    /// Projection to the hidden size
    pub hidden: Linear<B>,

    /// Projection to the classes
    pub output: Linear<B>,

    /// Dropout applied to the hidden activations
    pub dropout: Dropout,
}

impl<B: Backend> Head<B> {
    /// Map `[batch_size, d_input]` representations to `[batch_size, n_classes]` log-probabilities
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(input));
        let x = self.dropout.forward(x);

        log_softmax(self.output.forward(x), 1)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;
    use crate::utils::tensors::to_vec;

    #[test]
    fn outputs_normalized_log_probabilities() {
        let device = Default::default();
        let head = HeadConfig::new(8).with_d_hidden(4).init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random(
            [3, 8],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = head.forward(input);

        assert_eq!(output.dims(), [3, 2]);

        let probs = to_vec(output.exp().sum_dim(1));
        for total in probs {
            assert!((total - 1.0).abs() < 1e-5);
        }
    }
}
