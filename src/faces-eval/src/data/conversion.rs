use crate::common::CHANNELS;

use burn::{prelude::*, tensor::Tensor};
use image::RgbImage;

/// Lays an RGB image out as a `[1, 3, H, W]` tensor in BGR channel order with
/// raw `0..=255` intensities, the input convention of the VGGFace2 ResNet50.
pub fn convert_image_to_tensor<B: Backend>(img: &RgbImage, device: &Device<B>) -> Tensor<B, 4> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let hw = height * width;
    let mut buf = vec![0f32; CHANNELS * hw];
    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let idx = y as usize * width + x as usize;
        buf[idx] = b as f32;
        buf[hw + idx] = g as f32;
        buf[2 * hw + idx] = r as f32;
    }
    Tensor::<B, 3>::from_data(
        TensorData::new(buf, [CHANNELS, height, width]).convert::<B::FloatElem>(),
        device,
    )
    .reshape([1, CHANNELS, height, width])
}

pub fn convert_labels_to_tensor<B: Backend>(
    labels: &[usize],
    device: &Device<B>,
) -> Tensor<B, 1, Int> {
    let ids: Vec<i64> = labels.iter().map(|&label| label as i64).collect();
    Tensor::from_data(
        TensorData::new(ids, [labels.len()]).convert::<B::IntElem>(),
        device,
    )
}
