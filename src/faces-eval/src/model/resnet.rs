use crate::model::blocks::ResidualStage;
use burn::{
    nn::{
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Bottleneck blocks per stage.
    pub blocks: [usize; 4],
    pub num_classes: usize,
    /// Width of the stem; stage `i` outputs `base_channels * 2^i * expansion`.
    #[config(default = 64)]
    pub base_channels: usize,
    #[config(default = 4)]
    pub expansion: usize,
    /// VGGFace2 checkpoints stride the first 1x1 convolution of a block.
    #[config(default = true)]
    pub stride_on_reduce: bool,
}

impl ResNetConfig {
    pub fn resnet50(num_classes: usize) -> Self {
        Self::new([3, 4, 6, 3], num_classes)
    }

    pub fn feature_dim(&self) -> usize {
        self.base_channels * 8 * self.expansion
    }

    pub fn init<B: Backend>(&self, device: &Device<B>) -> FaceResNet<B> {
        let base = self.base_channels;
        let e = self.expansion;
        let stage = |idx: usize, in_channels: usize, stride: usize| {
            ResidualStage::new(
                self.blocks[idx],
                in_channels,
                base * (1 << idx) * e,
                e,
                stride,
                self.stride_on_reduce,
                device,
            )
        };

        FaceResNet {
            conv1: Conv2dConfig::new([3, base], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_bias(false)
                .init(device),
            norm1: BatchNormConfig::new(base).init(device),
            relu: Relu::new(),
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            layer1: stage(0, base, 1),
            layer2: stage(1, base * e, 2),
            layer3: stage(2, base * 2 * e, 2),
            layer4: stage(3, base * 4 * e, 2),
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(self.feature_dim(), self.num_classes).init(device),
        }
    }
}

/// ResNet classifier over BGR, mean-subtracted face crops.
#[derive(Module, Debug)]
pub struct FaceResNet<B: Backend> {
    conv1: Conv2d<B>,
    norm1: BatchNorm<B, 2>,
    relu: Relu,
    maxpool: MaxPool2d,
    layer1: ResidualStage<B>,
    layer2: ResidualStage<B>,
    layer3: ResidualStage<B>,
    layer4: ResidualStage<B>,
    avgpool: AdaptiveAvgPool2d,
    fc: Linear<B>,
}

impl<B: Backend> FaceResNet<B> {
    /// Returns logits of shape `[batch, num_classes]`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(input);
        let x = self.norm1.forward(x);
        let x = self.relu.forward(x);
        let x = self.maxpool.forward(x);

        let x = self.layer1.forward(x);
        let x = self.layer2.forward(x);
        let x = self.layer3.forward(x);
        let x = self.layer4.forward(x);

        let x = self.avgpool.forward(x);
        let x = x.flatten(1, 3);
        self.fc.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn resnet50_layout() {
        let config = ResNetConfig::resnet50(12);
        assert_eq!(config.blocks, [3, 4, 6, 3]);
        assert_eq!(config.feature_dim(), 2048);
        assert!(config.stride_on_reduce);
    }

    #[test]
    fn small_network_produces_class_logits() {
        let device = Default::default();
        let config = ResNetConfig::new([1, 1, 1, 1], 5).with_base_channels(4);
        let model = config.init::<TestBackend>(&device);

        let logits = model.forward(Tensor::ones([2, 3, 32, 32], &device));
        assert_eq!(logits.dims(), [2, 5]);
    }
}
