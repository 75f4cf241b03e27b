//! Frame data structures for captured camera content

use image::GrayImage;
use std::time::Instant;

/// One color frame from the camera.
///
/// Lives for a single loop iteration and is discarded after processing.
#[derive(Debug)]
pub struct VideoFrame {
    /// Raw RGB pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when the frame was captured
    pub timestamp: Instant,
}

impl VideoFrame {
    /// Create a new frame from RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Convert the frame to single-channel grayscale.
    pub fn to_gray(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = ((y * self.width + x) * 3) as usize;
                if idx + 2 < self.data.len() {
                    let r = self.data[idx] as f32;
                    let g = self.data[idx + 1] as f32;
                    let b = self.data[idx + 2] as f32;
                    // Standard luma weights
                    let value = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
                    gray.put_pixel(x, y, image::Luma([value]));
                }
            }
        }

        gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_gray_uses_luma_weights() {
        // One green pixel, one blue pixel.
        let data = vec![0, 255, 0, 0, 0, 255];
        let frame = VideoFrame::new(data, 2, 1);

        let gray = frame.to_gray();
        let green = gray.get_pixel(0, 0).0[0];
        let blue = gray.get_pixel(1, 0).0[0];

        assert!(green > blue, "green should be brighter than blue");
    }

    #[test]
    fn test_dimensions() {
        let frame = VideoFrame::new(vec![0; 6 * 4 * 3], 6, 4);
        assert_eq!(frame.dimensions(), (6, 4));
    }

    #[test]
    fn test_frames_carry_capture_order_timestamps() {
        let first = VideoFrame::new(vec![0; 3], 1, 1);
        let second = VideoFrame::new(vec![0; 3], 1, 1);
        assert!(second.timestamp >= first.timestamp);
    }
}
