use burn::{prelude::*, tensor::Tensor};

/// Per-channel mean subtraction in BGR order. VGGFace2 weights expect no
/// scaling by a standard deviation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizeConfig {
    pub mean_bgr: [f32; 3],
}

impl NormalizeConfig {
    pub fn new(mean_bgr: [f32; 3]) -> Self {
        Self { mean_bgr }
    }
}

pub fn normalize<B: Backend>(tensor: Tensor<B, 4>, config: &NormalizeConfig) -> Tensor<B, 4> {
    let mean = Tensor::from_data(
        TensorData::new(config.mean_bgr.to_vec(), [1, 3, 1, 1]).convert::<B::FloatElem>(),
        &tensor.device(),
    );

    tensor - mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn subtracts_channel_means() {
        let device = Default::default();
        let input = Tensor::<NdArray, 4>::from_data(
            TensorData::new(vec![100.0f32, 110.0, 120.0, 130.0, 140.0, 150.0], [1, 3, 1, 2]),
            &device,
        );
        let out = normalize(input, &NormalizeConfig::new([100.0, 120.0, 140.0]));
        let values = out.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 10.0, 0.0, 10.0, 0.0, 10.0]);
    }
}
