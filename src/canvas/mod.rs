//! Interactive drawing canvas front-end
//!
//! `CanvasSession` holds the drawing state explicitly (raster, last
//! pointer position, eraser toggle) so stroke handling can be exercised
//! without a live window; `app` wires it to egui.

pub mod app;

pub use app::run_canvas;

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;

/// State of one drawing session.
///
/// The raster is a single-channel image owned exclusively by the session:
/// black background, white strokes, mutated by pointer events and reset
/// to blank on clear.
pub struct CanvasSession {
    raster: GrayImage,
    brush_width: u32,
    eraser: bool,
    last_point: Option<(f32, f32)>,
}

impl CanvasSession {
    /// Create a blank square session.
    pub fn new(side: u32, brush_width: u32) -> Self {
        Self {
            raster: GrayImage::new(side, side),
            brush_width: brush_width.max(1),
            eraser: false,
            last_point: None,
        }
    }

    /// Side length of the drawing surface.
    pub fn side(&self) -> u32 {
        self.raster.width()
    }

    /// The current raster.
    pub fn image(&self) -> &GrayImage {
        &self.raster
    }

    /// Whether the eraser is active.
    pub fn eraser_active(&self) -> bool {
        self.eraser
    }

    /// Toggle the eraser and return its new state.
    pub fn toggle_eraser(&mut self) -> bool {
        self.eraser = !self.eraser;
        self.eraser
    }

    /// Begin a stroke at the given canvas position.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.stamp(x, y);
        self.last_point = Some((x, y));
    }

    /// Continue a stroke to the given canvas position.
    pub fn pointer_drag(&mut self, x: f32, y: f32) {
        match self.last_point {
            Some((lx, ly)) => self.stroke_segment(lx, ly, x, y),
            None => self.stamp(x, y),
        }
        self.last_point = Some((x, y));
    }

    /// End the current stroke.
    pub fn release(&mut self) {
        self.last_point = None;
    }

    /// Reset the raster to blank and forget the stroke in progress.
    pub fn clear(&mut self) {
        let side = self.side();
        self.raster = GrayImage::new(side, side);
        self.last_point = None;
    }

    /// Ink color for the current mode.
    fn ink(&self) -> Luma<u8> {
        if self.eraser {
            Luma([0])
        } else {
            Luma([255])
        }
    }

    /// Stamp one brush dab.
    fn stamp(&mut self, x: f32, y: f32) {
        let radius = (self.brush_width / 2) as i32;
        let ink = self.ink();
        draw_filled_circle_mut(&mut self.raster, (x as i32, y as i32), radius, ink);
    }

    /// Draw a brush-width segment by stamping dabs along the line.
    fn stroke_segment(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let length = (dx * dx + dy * dy).sqrt();
        let steps = length.ceil().max(1.0) as u32;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(x0 + dx * t, y0 + dy * t);
        }
    }
}
