//! Live webcam digit recognition front-end
//!
//! A single-threaded polling loop: capture a frame, localize candidate
//! digit regions, classify each one, draw the results over the frame.
//! Pressing `q` ends the run; a failed frame read ends it gracefully.

use eframe::egui;
use tracing::{debug, warn};

use crate::capture::{FrameSource, VideoFrame};
use crate::vision::{locate_digits, LocalizerConfig, Recognizer};

/// One classified region, in frame coordinates.
#[derive(Debug, Clone)]
struct Overlay {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    digit: u8,
    confidence: f32,
}

/// Sequential frame supply with end-of-stream tracking.
///
/// A read failure ends the stream: it is logged once, the feed flips to
/// ended, and the underlying source is never polled again.
pub struct FrameFeed {
    source: Box<dyn FrameSource>,
    ended: bool,
}

impl FrameFeed {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            ended: false,
        }
    }

    /// Whether the stream has ended.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Pull the next frame, or `None` once the stream has ended.
    pub fn next(&mut self) -> Option<VideoFrame> {
        if self.ended {
            return None;
        }
        match self.source.next_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Frame capture failed, ending stream: {}", e);
                self.ended = true;
                None
            }
        }
    }
}

/// The live recognition application
pub struct LiveApp {
    feed: FrameFeed,
    recognizer: Recognizer,
    localizer: LocalizerConfig,
    texture: Option<egui::TextureHandle>,
    overlays: Vec<Overlay>,
    frame_size: (u32, u32),
}

impl LiveApp {
    pub fn new(
        source: Box<dyn FrameSource>,
        recognizer: Recognizer,
        localizer: LocalizerConfig,
    ) -> Self {
        Self {
            feed: FrameFeed::new(source),
            recognizer,
            localizer,
            texture: None,
            overlays: Vec::new(),
            frame_size: (0, 0),
        }
    }

    fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([960.0, 600.0])
                .with_title("Digit Lens - Live"),
            ..Default::default()
        }
    }

    /// Localize, classify, and display one frame. Every frame starts
    /// detection from scratch; no region identity is carried across frames.
    fn process_frame(&mut self, frame: VideoFrame, ctx: &egui::Context) {
        let gray = frame.to_gray();
        self.overlays.clear();
        for region in locate_digits(&gray, &self.localizer) {
            match self.recognizer.recognize(&region.patch) {
                Ok(prediction) => self.overlays.push(Overlay {
                    x: region.x,
                    y: region.y,
                    width: region.width,
                    height: region.height,
                    digit: prediction.digit,
                    confidence: prediction.confidence,
                }),
                Err(e) => warn!("Classification failed for region: {:#}", e),
            }
        }
        debug!(
            "Frame processed in {:?}, {} region(s)",
            frame.timestamp.elapsed(),
            self.overlays.len()
        );

        self.frame_size = frame.dimensions();
        let color_image = egui::ColorImage::from_rgb(
            [frame.width as usize, frame.height as usize],
            &frame.data,
        );
        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("live", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }
}

impl eframe::App for LiveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        if let Some(frame) = self.feed.next() {
            self.process_frame(frame, ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Press 'q' to quit");
                if self.feed.ended() {
                    ui.colored_label(egui::Color32::YELLOW, "camera stream ended");
                }
            });

            let Some(texture) = &self.texture else {
                ui.label("Waiting for the first frame...");
                return;
            };

            let (fw, fh) = (self.frame_size.0 as f32, self.frame_size.1 as f32);
            let available = ui.available_size();
            let scale = (available.x / fw).min(available.y / fh).min(2.0);
            let display = egui::vec2(fw * scale, fh * scale);

            let (response, painter) = ui.allocate_painter(display, egui::Sense::hover());
            painter.image(
                texture.id(),
                response.rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let origin = response.rect.min;
            for overlay in &self.overlays {
                let rect = egui::Rect::from_min_size(
                    origin + egui::vec2(overlay.x as f32 * scale, overlay.y as f32 * scale),
                    egui::vec2(
                        overlay.width as f32 * scale,
                        overlay.height as f32 * scale,
                    ),
                );
                painter.rect_stroke(
                    rect,
                    0.0,
                    egui::Stroke::new(2.0, egui::Color32::GREEN),
                );
                painter.text(
                    rect.left_top() - egui::vec2(0.0, 4.0),
                    egui::Align2::LEFT_BOTTOM,
                    format!("{} ({:.0}%)", overlay.digit, overlay.confidence * 100.0),
                    egui::FontId::proportional(18.0),
                    egui::Color32::LIGHT_BLUE,
                );
            }
        });

        // Poll the camera again on the next repaint.
        if !self.feed.ended() {
            ctx.request_repaint();
        }
    }
}

/// Run the live front-end (blocking).
pub fn run_live(
    source: Box<dyn FrameSource>,
    recognizer: Recognizer,
    localizer: LocalizerConfig,
) -> Result<(), eframe::Error> {
    let app = LiveApp::new(source, recognizer, localizer);
    eframe::run_native(
        "Digit Lens - Live",
        LiveApp::options(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, VideoFrame};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Source that yields a fixed number of blank frames, then fails,
    /// counting every poll it receives.
    struct StubSource {
        remaining: u32,
        polls: Arc<AtomicU32>,
    }

    impl StubSource {
        fn new(frames: u32) -> (Self, Arc<AtomicU32>) {
            let polls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    remaining: frames,
                    polls: polls.clone(),
                },
                polls,
            )
        }
    }

    impl FrameSource for StubSource {
        fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.remaining == 0 {
                return Err(CaptureError::Read(nokhwa::NokhwaError::ReadFrameError(
                    "stream over".to_string(),
                )));
            }
            self.remaining -= 1;
            Ok(VideoFrame::new(vec![0u8; 64 * 48 * 3], 64, 48))
        }
    }

    #[test]
    fn test_feed_delivers_frames_until_read_fails() {
        let (source, _) = StubSource::new(2);
        let mut feed = FrameFeed::new(Box::new(source));

        assert!(feed.next().is_some());
        assert!(feed.next().is_some());
        assert!(!feed.ended());

        assert!(feed.next().is_none());
        assert!(feed.ended());
    }

    #[test]
    fn test_failed_read_ends_stream_without_further_polls() {
        let (source, polls) = StubSource::new(0);
        let mut feed = FrameFeed::new(Box::new(source));

        assert!(feed.next().is_none());
        assert!(feed.ended());

        // Once ended, the source is never polled again.
        assert!(feed.next().is_none());
        assert!(feed.next().is_none());
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }
}
