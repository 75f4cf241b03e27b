//! Image preprocessing for the digit classifier
//!
//! Converts an arbitrary-resolution single-channel image into the 28x28
//! normalized tensor the model consumes.

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;

/// Side length of the model input raster.
pub const INPUT_SIDE: u32 = 28;

/// Normalized model input tensor, shape (1, 28, 28, 1), values are f32.
///
/// Built fresh for every prediction and never mutated afterwards. Values
/// are in [0, 1] unless mean-centering was applied, in which case they may
/// be negative.
#[derive(Debug, Clone)]
pub struct ModelInput(Array4<f32>);

impl ModelInput {
    /// Tensor shape as (batch, height, width, channels).
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        let s = self.0.shape();
        (s[0], s[1], s[2], s[3])
    }

    /// Borrow the underlying array.
    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }
}

/// Preprocess a grayscale image into a model input tensor.
///
/// Steps, in order:
/// 1. Resize to 28x28 with bilinear interpolation, disregarding aspect
///    ratio (the training data assumes the digit roughly fills the frame).
///    A source that is already 28x28 is passed through unchanged.
/// 2. Scale pixel values into [0, 1] by dividing by 255.
/// 3. If `center` is set, subtract the mean pixel value from every pixel.
///    A fully blank image short-circuits to an all-zero tensor so the
///    mean subtraction never runs on an empty distribution.
/// 4. Reshape to (1, 28, 28, 1).
pub fn to_model_input(image: &GrayImage, center: bool) -> ModelInput {
    let side = INPUT_SIDE;
    let resized = if image.dimensions() == (side, side) {
        image.clone()
    } else {
        imageops::resize(image, side, side, FilterType::Triangle)
    };

    let h = side as usize;
    let w = side as usize;
    let mut tensor = Array4::<f32>::zeros((1, h, w, 1));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, y as usize, x as usize, 0]] = pixel.0[0] as f32 / 255.0;
    }

    if center {
        let sum = tensor.sum();
        if sum == 0.0 {
            return ModelInput(Array4::zeros((1, h, w, 1)));
        }
        let mean = sum / (h * w) as f32;
        tensor.mapv_inplace(|v| v - mean);
    }

    ModelInput(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform_image(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn test_output_shape_for_arbitrary_sizes() {
        for (w, h) in [(1, 1), (28, 28), (400, 400), (640, 480), (3, 97)] {
            let img = uniform_image(w, h, 200);
            let input = to_model_input(&img, false);
            assert_eq!(input.shape(), (1, 28, 28, 1), "source size {}x{}", w, h);
        }
    }

    #[test]
    fn test_blank_image_centers_to_exact_zeros() {
        let img = uniform_image(100, 100, 0);
        let input = to_model_input(&img, true);
        assert!(input.as_array().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_plain_variant_stays_in_unit_range() {
        let mut img = uniform_image(56, 56, 0);
        img.put_pixel(10, 10, Luma([255]));
        img.put_pixel(30, 40, Luma([128]));

        let input = to_model_input(&img, false);
        assert!(input.as_array().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_centered_variant_has_zero_mean() {
        let mut img = uniform_image(56, 56, 40);
        img.put_pixel(5, 5, Luma([255]));

        let input = to_model_input(&img, true);
        let mean = input.as_array().sum() / (28.0 * 28.0);
        assert!(mean.abs() < 1e-5, "mean after centering was {}", mean);
    }

    #[test]
    fn test_centered_values_may_be_negative() {
        let mut img = uniform_image(28, 28, 0);
        img.put_pixel(0, 0, Luma([255]));

        let input = to_model_input(&img, true);
        assert!(input.as_array().iter().any(|&v| v < 0.0));
    }

    #[test]
    fn test_resize_is_identity_for_28x28_input() {
        let mut img = uniform_image(28, 28, 0);
        for x in 0..28 {
            img.put_pixel(x, 14, Luma([x as u8 * 9]));
        }

        let input = to_model_input(&img, false);
        for x in 0..28usize {
            let expected = (x as u8 * 9) as f32 / 255.0;
            assert_eq!(input.as_array()[[0, 14, x, 0]], expected);
        }
    }
}
