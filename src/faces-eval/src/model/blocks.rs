use burn::{
    nn::{
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

fn conv<B: Backend>(
    channels: [usize; 2],
    kernel: usize,
    stride: usize,
    padding: usize,
    device: &Device<B>,
) -> Conv2d<B> {
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .init(device)
}

/// Projection shortcut used when a block changes resolution or width.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &Device<B>) -> Self {
        Self {
            conv: conv([in_channels, out_channels], 1, stride, 0, device),
            norm: BatchNormConfig::new(out_channels).init(device),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(input))
    }
}

/// 1x1 reduce, 3x3, 1x1 expand, with a residual connection.
///
/// Field names mirror the PyTorch state dict (`conv1`, `bn1` -> `norm1`, ...)
/// so checkpoints map with simple key remapping.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1: Conv2d<B>,
    norm1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    norm2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    norm3: BatchNorm<B, 2>,
    relu: Relu,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    /// `stride_on_reduce` puts the block stride on the first 1x1 convolution
    /// (Caffe / VGGFace2 layout) instead of the 3x3 one (torchvision layout).
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        expansion: usize,
        stride: usize,
        stride_on_reduce: bool,
        device: &Device<B>,
    ) -> Self {
        let width = out_channels / expansion;
        let (reduce_stride, spatial_stride) = if stride_on_reduce {
            (stride, 1)
        } else {
            (1, stride)
        };

        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));

        Self {
            conv1: conv([in_channels, width], 1, reduce_stride, 0, device),
            norm1: BatchNormConfig::new(width).init(device),
            conv2: conv([width, width], 3, spatial_stride, 1, device),
            norm2: BatchNormConfig::new(width).init(device),
            conv3: conv([width, out_channels], 1, 1, 0, device),
            norm3: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            downsample,
        }
    }

    pub fn has_downsample(&self) -> bool {
        self.downsample.is_some()
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(input.clone()),
            None => input.clone(),
        };

        let x = self.relu.forward(self.norm1.forward(self.conv1.forward(input)));
        let x = self.relu.forward(self.norm2.forward(self.conv2.forward(x)));
        let x = self.norm3.forward(self.conv3.forward(x));

        self.relu.forward(x + identity)
    }
}

/// A stage of bottleneck blocks; only the first one strides.
#[derive(Module, Debug)]
pub struct ResidualStage<B: Backend> {
    blocks: Vec<Bottleneck<B>>,
}

impl<B: Backend> ResidualStage<B> {
    pub fn new(
        num_blocks: usize,
        in_channels: usize,
        out_channels: usize,
        expansion: usize,
        stride: usize,
        stride_on_reduce: bool,
        device: &Device<B>,
    ) -> Self {
        let blocks = (0..num_blocks)
            .map(|b| {
                let (in_channels, stride) = if b == 0 {
                    (in_channels, stride)
                } else {
                    (out_channels, 1)
                };
                Bottleneck::new(
                    in_channels,
                    out_channels,
                    expansion,
                    stride,
                    stride_on_reduce,
                    device,
                )
            })
            .collect();

        Self { blocks }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks
            .iter()
            .fold(input, |x, block| block.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn stage_strides_once_and_projects_first_block() {
        let device = Default::default();
        let stage = ResidualStage::<TestBackend>::new(2, 8, 32, 4, 2, true, &device);
        assert_eq!(stage.blocks.len(), 2);
        assert!(stage.blocks[0].has_downsample());
        assert!(!stage.blocks[1].has_downsample());

        let out = stage.forward(Tensor::zeros([1, 8, 8, 8], &device));
        assert_eq!(out.dims(), [1, 32, 4, 4]);
    }

    #[test]
    fn stride_placement_does_not_change_output_shape() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 16, 6, 6], &device);
        for stride_on_reduce in [true, false] {
            let block = Bottleneck::<TestBackend>::new(16, 16, 4, 2, stride_on_reduce, &device);
            assert!(block.has_downsample());
            assert_eq!(block.forward(input.clone()).dims(), [2, 16, 3, 3]);
        }
    }
}
