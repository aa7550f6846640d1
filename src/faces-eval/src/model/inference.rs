use crate::model::resnet::FaceResNet;
use burn::{prelude::*, tensor::activation::softmax};
use color_eyre::{Result, eyre::eyre};

#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub class: usize,
    pub probabilities: Vec<f32>,
}

/// Forward pass followed by a softmax over classes; one prediction per image.
pub fn predict<B: Backend>(model: &FaceResNet<B>, images: Tensor<B, 4>) -> Result<Vec<Prediction>> {
    let logits = model.forward(images);
    let [_, num_classes] = logits.dims();

    let probs = softmax(logits, 1);
    let classes = probs.clone().argmax(1);

    let probs = probs
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| eyre!("Failed to read probabilities: {e:?}"))?;
    let classes = classes
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| eyre!("Failed to read predicted classes: {e:?}"))?;

    Ok(probs
        .chunks(num_classes)
        .zip(classes)
        .map(|(p, class)| Prediction {
            class: class as usize,
            probabilities: p.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resnet::ResNetConfig;
    use burn::backend::NdArray;

    #[test]
    fn probabilities_are_normalized_and_class_is_argmax() {
        let device = Default::default();
        let model = ResNetConfig::new([1, 1, 1, 1], 4)
            .with_base_channels(4)
            .init::<NdArray>(&device);
        let images = Tensor::<NdArray, 4>::random(
            [3, 3, 32, 32],
            burn::tensor::Distribution::Uniform(-100.0, 100.0),
            &device,
        );

        let predictions = predict(&model, images).unwrap();
        assert_eq!(predictions.len(), 3);
        for prediction in predictions {
            assert_eq!(prediction.probabilities.len(), 4);
            let sum: f32 = prediction.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);

            let max = prediction
                .probabilities
                .iter()
                .cloned()
                .fold(f32::MIN, f32::max);
            assert_eq!(prediction.probabilities[prediction.class], max);
        }
    }
}
