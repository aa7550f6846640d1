use crate::data::{
    conversion::{convert_image_to_tensor, convert_labels_to_tensor},
    dataset::FaceItem,
    normalize::{NormalizeConfig, normalize},
};

use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::Tensor};

#[derive(Clone, Debug)]
pub struct FaceBatcher {
    normalize: NormalizeConfig,
}

impl FaceBatcher {
    pub fn new(normalize: NormalizeConfig) -> Self {
        Self { normalize }
    }
}

#[derive(Clone, Debug)]
pub struct FaceBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub labels: Tensor<B, 1, Int>,
    pub filenames: Vec<String>,
}

impl<B: Backend> Batcher<B, FaceItem, FaceBatch<B>> for FaceBatcher {
    fn batch(&self, items: Vec<FaceItem>, device: &B::Device) -> FaceBatch<B> {
        let images: Vec<Tensor<B, 4>> = items
            .iter()
            .map(|item| convert_image_to_tensor::<B>(&item.image, device))
            .map(|tensor| normalize(tensor, &self.normalize))
            .collect();

        let labels: Vec<usize> = items.iter().map(|item| item.label).collect();
        let filenames = items.into_iter().map(|item| item.filename).collect();

        FaceBatch {
            images: Tensor::cat(images, 0),
            labels: convert_labels_to_tensor(&labels, device),
            filenames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fold::Fold;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    fn item(name: &str, label: usize, value: u8) -> FaceItem {
        FaceItem {
            image: RgbImage::from_pixel(4, 4, Rgb([value, value, value])),
            label,
            filename: name.to_string(),
            fold: Fold::new(2).unwrap(),
        }
    }

    #[test]
    fn stacks_items_along_batch_dimension() {
        let device = Default::default();
        let batcher = FaceBatcher::new(NormalizeConfig::new([10.0, 20.0, 30.0]));
        let batch: FaceBatch<TestBackend> =
            batcher.batch(vec![item("a.png", 1, 50), item("b.png", 7, 60)], &device);

        assert_eq!(batch.images.dims(), [2, 3, 4, 4]);
        assert_eq!(batch.labels.dims(), [2]);
        assert_eq!(
            batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap(),
            vec![1, 7]
        );
        assert_eq!(batch.filenames, vec!["a.png".to_string(), "b.png".to_string()]);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        // First sample, blue channel: 50 - 10.
        assert_eq!(values[0], 40.0);
        // Second sample, red channel: 60 - 30.
        assert_eq!(values[3 * 16 + 2 * 16], 30.0);
    }
}
