//! CNN Model Architecture for Sugarcane Disease Classification
//!
//! The network is consumed as a pretrained artifact: this module only
//! declares the architecture so a saved Burn record can be loaded into it.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Four 2x2 poolings: input sides must be a positive multiple of this
pub const INPUT_SIZE_MULTIPLE: usize = 16;

/// Whether a square input of `size` pixels survives every pooling stage
pub fn is_valid_input_size(size: usize) -> bool {
    size >= INPUT_SIZE_MULTIPLE && size % INPUT_SIZE_MULTIPLE == 0
}

/// Configuration for the SugarcaneClassifier CNN model
#[derive(Config, Debug)]
pub struct SugarcaneClassifierConfig {
    /// Number of output classes (5 for the default sugarcane class set)
    #[config(default = "5")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "224")]
    pub input_size: usize,

    /// Dropout rate used during training (inactive at inference)
    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,

    /// Hidden units of the classifier head
    #[config(default = "256")]
    pub hidden_units: usize,
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Sugarcane leaf disease classifier
///
/// Architecture:
/// - 4 convolutional blocks (3 -> b -> 2b -> 4b -> 8b filters), each halving resolution
/// - Global Average Pooling, so any input size divisible by 16 works
/// - Fully connected head with dropout
#[derive(Module, Debug)]
pub struct SugarcaneClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,

    pub global_pool: AdaptiveAvgPool2d,

    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> SugarcaneClassifier<B> {
    /// Create a randomly initialized classifier from configuration
    pub fn new(config: &SugarcaneClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, base, device),
            conv2: ConvBlock::new(base, base * 2, device),
            conv3: ConvBlock::new(base * 2, base * 4, device),
            conv4: ConvBlock::new(base * 4, base * 8, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1: LinearConfig::new(base * 8, config.hidden_units).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            fc2: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass: `[batch, 3, H, W]` -> logits `[batch, num_classes]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;

    type TestBackend = InferenceBackend;

    fn tiny_config() -> SugarcaneClassifierConfig {
        SugarcaneClassifierConfig::new()
            .with_input_size(32)
            .with_base_filters(4)
            .with_hidden_units(8)
    }

    #[test]
    fn test_classifier_output_shape() {
        let device = Default::default();
        let model = SugarcaneClassifier::<TestBackend>::new(&tiny_config(), &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let dims = model.forward(input).dims();

        assert_eq!(dims[0], 2);
        assert_eq!(dims[1], 5);
        assert_eq!(model.num_classes(), 5);
    }

    #[test]
    fn test_input_size_must_survive_pooling() {
        assert!(is_valid_input_size(16));
        assert!(is_valid_input_size(224));
        assert!(!is_valid_input_size(0));
        assert!(!is_valid_input_size(8));
        assert!(!is_valid_input_size(100));
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let model = SugarcaneClassifier::<TestBackend>::new(&tiny_config(), &device);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let probs: Vec<f32> = model
            .forward_softmax(input)
            .into_data()
            .to_vec()
            .expect("f32 output");

        assert_eq!(probs.len(), 5);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }
}
