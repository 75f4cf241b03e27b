//! Vision layer
//!
//! Everything between a raster and a digit: preprocessing into the model
//! input tensor, digit region localization for video frames, and the ONNX
//! classifier wrapper.

pub mod classifier;
pub mod localize;
pub mod model;
pub mod preprocess;

pub use classifier::{DigitClassifier, Prediction, NUM_CLASSES};
pub use localize::{locate_digits, DigitRegion, LocalizerConfig};
pub use model::ModelManager;
pub use preprocess::{to_model_input, ModelInput, INPUT_SIDE};

use anyhow::Result;
use image::GrayImage;

/// Preprocess-and-classify front for the UI layers.
///
/// The front-ends hand an image in and get a prediction back; neither the
/// windowing code nor the capture loop touches tensors or the session
/// directly, so the recognition path stays testable without a UI.
pub struct Recognizer {
    classifier: DigitClassifier,
    /// Whether to mean-center inputs before inference
    center: bool,
}

impl Recognizer {
    /// Wrap a loaded classifier.
    pub fn new(classifier: DigitClassifier, center: bool) -> Self {
        Self { classifier, center }
    }

    /// Preprocess a grayscale image and classify it.
    pub fn recognize(&mut self, image: &GrayImage) -> Result<Prediction> {
        let input = to_model_input(image, self.center);
        self.classifier.predict(&input)
    }
}
