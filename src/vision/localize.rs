//! Digit region localization for live video frames
//!
//! Segments candidate digit regions out of a grayscale frame: Gaussian
//! blur, inverted adaptive threshold, external contour detection, and a
//! minimum-size noise filter on the resulting bounding boxes.

use image::imageops;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::filter::{box_filter, gaussian_blur_f32};
use serde::{Deserialize, Serialize};

/// Tuning parameters for digit localization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizerConfig {
    /// Gaussian blur sigma applied before thresholding
    pub blur_sigma: f32,
    /// Radius of the local-mean neighborhood for adaptive thresholding
    /// (a radius of 5 gives an 11x11 block)
    pub block_radius: u32,
    /// Offset subtracted from the local mean; pixels must be darker than
    /// `mean - offset` to count as foreground
    pub threshold_offset: u8,
    /// Bounding boxes with width or height at or below this are discarded
    pub min_region_side: u32,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            block_radius: 5,
            threshold_offset: 2,
            min_region_side: 5,
        }
    }
}

/// A candidate digit region found in one frame.
///
/// `patch` is the thresholded (binary) crop delimited by the bounding box,
/// ready for preprocessing. Regions are only valid for the frame they came
/// from; there is no identity across frames.
#[derive(Debug, Clone)]
pub struct DigitRegion {
    /// Bounding box top-left x in frame coordinates
    pub x: u32,
    /// Bounding box top-left y in frame coordinates
    pub y: u32,
    /// Bounding box width
    pub width: u32,
    /// Bounding box height
    pub height: u32,
    /// Thresholded pixels inside the bounding box (strokes white)
    pub patch: GrayImage,
}

/// Locate candidate digit regions in a grayscale frame.
///
/// Assumes dark strokes on a lighter background, as seen by a camera
/// pointed at handwriting. The threshold polarity is inverted so strokes
/// become the high value in the binary image. Only external contours are
/// reported; holes inside a stroke are not separate regions. No ordering
/// is guaranteed across the returned regions.
pub fn locate_digits(gray: &GrayImage, config: &LocalizerConfig) -> Vec<DigitRegion> {
    let binary = binarize(gray, config);
    let min_side = config.min_region_side;

    find_contours::<i32>(&binary)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter_map(|contour| {
            let (x, y, width, height) = bounding_box(&contour.points)?;
            if width <= min_side || height <= min_side {
                return None;
            }
            let patch = imageops::crop_imm(&binary, x, y, width, height).to_image();
            Some(DigitRegion {
                x,
                y,
                width,
                height,
                patch,
            })
        })
        .collect()
}

/// Binarize a grayscale frame with an inverted adaptive threshold.
///
/// The threshold for each pixel is the mean of its surrounding block minus
/// a small offset, which keeps the binarization robust under uneven
/// lighting and maps a uniform frame to all-background.
fn binarize(gray: &GrayImage, config: &LocalizerConfig) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, config.blur_sigma);
    let local_mean = box_filter(&blurred, config.block_radius, config.block_radius);

    let (width, height) = blurred.dimensions();
    let mut binary = GrayImage::new(width, height);
    for (x, y, pixel) in blurred.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y).0[0] as i16;
        let value = pixel.0[0] as i16;
        if value < mean - config.threshold_offset as i16 {
            binary.put_pixel(x, y, image::Luma([255u8]));
        }
    }

    binary
}

/// Axis-aligned bounding box of a contour's points as (x, y, width, height).
fn bounding_box(points: &[imageproc::point::Point<i32>]) -> Option<(u32, u32, u32, u32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some((
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// White background with a dark filled square at (x, y).
    fn frame_with_square(x: u32, y: u32, side: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(120, 120, Luma([220]));
        for dy in 0..side {
            for dx in 0..side {
                img.put_pixel(x + dx, y + dy, Luma([10]));
            }
        }
        img
    }

    #[test]
    fn test_black_frame_yields_no_regions() {
        let img = GrayImage::from_pixel(100, 100, Luma([0]));
        let regions = locate_digits(&img, &LocalizerConfig::default());
        assert!(regions.is_empty());
    }

    #[test]
    fn test_uniform_frame_yields_no_regions() {
        let img = GrayImage::from_pixel(100, 100, Luma([180]));
        let regions = locate_digits(&img, &LocalizerConfig::default());
        assert!(regions.is_empty());
    }

    #[test]
    fn test_dark_square_is_located() {
        let img = frame_with_square(40, 50, 20);
        let regions = locate_digits(&img, &LocalizerConfig::default());

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert!(region.width >= 18 && region.width <= 24);
        assert!(region.height >= 18 && region.height <= 24);
        // Bounding box should sit on the square, give or take blur spill.
        assert!(region.x >= 36 && region.x <= 42);
        assert!(region.y >= 46 && region.y <= 52);
        assert_eq!(region.patch.dimensions(), (region.width, region.height));
    }

    #[test]
    fn test_regions_respect_minimum_size() {
        // A single-pixel speck is below the noise threshold even after
        // blur spread.
        let img = frame_with_square(60, 60, 1);
        let regions = locate_digits(&img, &LocalizerConfig::default());
        assert!(regions.is_empty());

        // Any region that does come back must exceed the minimum side.
        let img = frame_with_square(20, 20, 30);
        let config = LocalizerConfig::default();
        for region in locate_digits(&img, &config) {
            assert!(region.width > config.min_region_side);
            assert!(region.height > config.min_region_side);
        }
    }

    #[test]
    fn test_two_separated_squares_give_two_regions() {
        let mut img = frame_with_square(15, 15, 20);
        for dy in 0..20 {
            for dx in 0..20 {
                img.put_pixel(80 + dx, 80 + dy, Luma([10]));
            }
        }

        let regions = locate_digits(&img, &LocalizerConfig::default());
        assert_eq!(regions.len(), 2);
    }
}
