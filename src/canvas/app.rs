//! egui window for the drawing canvas

use eframe::egui;
use tracing::error;

use super::CanvasSession;
use crate::vision::Recognizer;

const IDLE_STATUS: &str = "Draw a digit and click 'Recognize'";

/// The canvas application
pub struct CanvasApp {
    session: CanvasSession,
    recognizer: Recognizer,
    texture: Option<egui::TextureHandle>,
    status: String,
}

impl CanvasApp {
    pub fn new(session: CanvasSession, recognizer: Recognizer) -> Self {
        Self {
            session,
            recognizer,
            texture: None,
            status: IDLE_STATUS.to_string(),
        }
    }

    /// Create eframe options for the canvas window
    fn options(side: u32) -> eframe::NativeOptions {
        let width = (side as f32 + 40.0).max(360.0);
        let height = side as f32 + 180.0;
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width, height])
                .with_resizable(false)
                .with_title("Digit Lens"),
            ..Default::default()
        }
    }

    /// Upload the session raster as a texture.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let image = self.session.image();
        let (width, height) = image.dimensions();

        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for pixel in image.pixels() {
            let v = pixel.0[0];
            rgba.extend_from_slice(&[v, v, v, 255]);
        }

        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [width as usize, height as usize],
            &rgba,
        );

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture(
                    "canvas",
                    color_image,
                    egui::TextureOptions::NEAREST,
                ));
            }
        }
    }

    fn recognize(&mut self) {
        match self.recognizer.recognize(self.session.image()) {
            Ok(prediction) => {
                self.status = format!(
                    "Predicted: {} ({:.2}%)",
                    prediction.digit,
                    prediction.confidence_percent()
                );
            }
            Err(e) => {
                error!("Recognition failed: {:#}", e);
                self.status = "Recognition failed (see log)".to_string();
            }
        }
    }
}

impl eframe::App for CanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_texture(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Handwritten Digit Recognition");
                ui.add_space(8.0);

                let side = self.session.side() as f32;
                let (response, painter) =
                    ui.allocate_painter(egui::vec2(side, side), egui::Sense::drag());

                if let Some(texture) = &self.texture {
                    painter.image(
                        texture.id(),
                        response.rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                if let Some(pos) = response.interact_pointer_pos() {
                    let local = pos - response.rect.min;
                    if response.drag_started() {
                        self.session.pointer_down(local.x, local.y);
                    } else if response.dragged() {
                        self.session.pointer_drag(local.x, local.y);
                    }
                }
                if response.drag_stopped() {
                    self.session.release();
                }

                ui.add_space(12.0);

                ui.horizontal(|ui| {
                    ui.add_space((ui.available_width() - 300.0).max(0.0) / 2.0);
                    if ui.button("Recognize").clicked() {
                        self.recognize();
                    }
                    if ui.button("Clear").clicked() {
                        self.session.clear();
                        self.status = IDLE_STATUS.to_string();
                    }
                    let eraser_label = if self.session.eraser_active() {
                        "Eraser: on"
                    } else {
                        "Eraser: off"
                    };
                    if ui.button(eraser_label).clicked() {
                        self.session.toggle_eraser();
                    }
                });

                ui.add_space(8.0);
                ui.label(egui::RichText::new(&self.status).size(16.0).strong());
            });
        });
    }
}

/// Run the canvas front-end (blocking).
pub fn run_canvas(session: CanvasSession, recognizer: Recognizer) -> Result<(), eframe::Error> {
    let side = session.side();
    let app = CanvasApp::new(session, recognizer);
    eframe::run_native(
        "Digit Lens",
        CanvasApp::options(side),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
