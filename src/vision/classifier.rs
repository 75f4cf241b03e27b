//! Digit classifier built on ONNX Runtime
//!
//! Wraps the opaque model in a stable call contract: a (1, 28, 28, 1)
//! input tensor in, a 10-class probability distribution out.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;
use tracing::{debug, info};

use super::preprocess::ModelInput;

/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

/// Result of classifying one image.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted digit (0-9)
    pub digit: u8,
    /// Probability of the predicted digit (0.0 - 1.0)
    pub confidence: f32,
    /// Full class distribution
    pub probabilities: [f32; NUM_CLASSES],
}

impl Prediction {
    /// Confidence expressed as a percentage for display.
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// Tensor layout the loaded graph expects for its image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    /// (batch, height, width, channels) - the native contract layout
    Nhwc,
    /// (batch, channels, height, width) - common for exported graphs
    Nchw,
}

/// ONNX Runtime session wrapper
pub struct OnnxSession {
    session: Session,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OnnxSession {
    /// Create a new ONNX session from a model file
    pub fn new(model_path: &Path) -> Result<Self> {
        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model at {:?}", model_path))?;

        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        info!(
            "Model loaded. Inputs: {:?}, Outputs: {:?}",
            input_names, output_names
        );

        Ok(Self {
            session,
            input_names,
            output_names,
        })
    }

    /// Get the underlying session mutably for running inference
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Get input names
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Get output names
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Declared shapes of the graph's inputs
    pub fn input_shapes(&self) -> Vec<Vec<i64>> {
        self.session
            .inputs
            .iter()
            .map(|input| extract_shape(&input.input_type))
            .collect()
    }
}

/// Extract shape from ONNX value type
fn extract_shape(value_type: &ort::value::ValueType) -> Vec<i64> {
    if let Some(shape) = value_type.tensor_shape() {
        shape.iter().map(|&d| d).collect()
    } else {
        vec![]
    }
}

/// Classifier for handwritten digits.
///
/// Loaded once at process start and shared read-only across predictions;
/// only the ONNX Runtime session itself needs mutable access per call.
pub struct DigitClassifier {
    session: OnnxSession,
    input_name: String,
    output_name: String,
    layout: InputLayout,
    apply_softmax: bool,
}

impl DigitClassifier {
    /// Load the classifier from an ONNX file.
    ///
    /// `apply_softmax` should be set when the exported graph ends in raw
    /// logits rather than a softmax head. A missing or corrupt model file
    /// is fatal; the error carries enough context to diagnose it.
    pub fn load(model_path: &Path, apply_softmax: bool) -> Result<Self> {
        let session = OnnxSession::new(model_path)
            .context("Digit model could not be loaded; run `digit-lens fetch-model` first")?;

        let input_name = session
            .input_names()
            .first()
            .context("Model declares no inputs")?
            .clone();
        let output_name = session
            .output_names()
            .first()
            .context("Model declares no outputs")?
            .clone();

        let layout = detect_layout(&session);
        debug!("Model input layout: {:?}", layout);

        Ok(Self {
            session,
            input_name,
            output_name,
            layout,
            apply_softmax,
        })
    }

    /// Classify one preprocessed image.
    pub fn predict(&mut self, input: &ModelInput) -> Result<Prediction> {
        let array: Array4<f32> = match self.layout {
            InputLayout::Nhwc => input.as_array().clone(),
            InputLayout::Nchw => input
                .as_array()
                .clone()
                .permuted_axes([0, 3, 1, 2])
                .as_standard_layout()
                .to_owned(),
        };

        let tensor = TensorRef::from_array_view(array.view())
            .context("Failed to convert input tensor")?;
        let inputs = ort::inputs![self.input_name.as_str() => tensor];

        let outputs = self
            .session
            .session_mut()
            .run(inputs)
            .context("Model inference failed")?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor as f32")?;

        if data.len() != NUM_CLASSES {
            anyhow::bail!(
                "Expected a {}-class output, got shape {:?}",
                NUM_CLASSES,
                shape
            );
        }

        let mut probabilities = [0.0f32; NUM_CLASSES];
        probabilities.copy_from_slice(data);
        if self.apply_softmax {
            probabilities = softmax(&probabilities);
        }

        let (digit, confidence) = argmax_with_confidence(&probabilities);
        Ok(Prediction {
            digit: digit as u8,
            confidence,
            probabilities,
        })
    }
}

/// Decide whether the graph wants NHWC or NCHW image input.
fn detect_layout(session: &OnnxSession) -> InputLayout {
    session
        .input_shapes()
        .first()
        .map(|shape| layout_for_shape(shape))
        .unwrap_or(InputLayout::Nhwc)
}

/// Classify a declared input shape as NHWC or NCHW.
///
/// A single-element second axis with a non-single last axis is the NCHW
/// signature for grayscale input; anything else, including dynamic batch
/// dimensions, falls back to the native NHWC contract.
fn layout_for_shape(shape: &[i64]) -> InputLayout {
    if shape.len() == 4 && shape[1] == 1 && shape[3] != 1 {
        InputLayout::Nchw
    } else {
        InputLayout::Nhwc
    }
}

/// Index and value of the maximum probability; the first index wins ties.
pub fn argmax_with_confidence(probabilities: &[f32]) -> (usize, f32) {
    let mut best_index = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, &value) in probabilities.iter().enumerate() {
        if value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    (best_index, best_value)
}

/// Numerically stable softmax.
pub fn softmax(values: &[f32; NUM_CLASSES]) -> [f32; NUM_CLASSES] {
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0.0f32; NUM_CLASSES];
    let mut sum = 0.0f32;
    for (o, &v) in out.iter_mut().zip(values.iter()) {
        *o = (v - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_maximum() {
        let probs = [0.1, 0.05, 0.6, 0.05, 0.05, 0.05, 0.05, 0.02, 0.02, 0.01];
        let (digit, confidence) = argmax_with_confidence(&probs);
        assert_eq!(digit, 2);
        assert!((confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_tie_break_takes_first_index() {
        let probs = [0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let (digit, confidence) = argmax_with_confidence(&probs);
        assert_eq!(digit, 0);
        assert!((confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_percent() {
        let prediction = Prediction {
            digit: 7,
            confidence: 0.6,
            probabilities: [0.0; NUM_CLASSES],
        };
        assert!((prediction.confidence_percent() - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_layout_detection_from_declared_shape() {
        assert_eq!(layout_for_shape(&[1, 1, 28, 28]), InputLayout::Nchw);
        assert_eq!(layout_for_shape(&[1, 28, 28, 1]), InputLayout::Nhwc);
        // Dynamic batch dimensions keep the channel positions decisive.
        assert_eq!(layout_for_shape(&[-1, 1, 28, 28]), InputLayout::Nchw);
        assert_eq!(layout_for_shape(&[-1, 28, 28, 1]), InputLayout::Nhwc);
        // An undeclared shape falls back to the contract layout.
        assert_eq!(layout_for_shape(&[]), InputLayout::Nhwc);
    }

    #[test]
    fn test_softmax_is_a_distribution() {
        let logits = [2.0, -1.0, 0.5, 0.0, 3.0, -2.0, 1.0, 0.0, -0.5, 0.25];
        let probs = softmax(&logits);

        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));

        // Ordering of the inputs survives the transform.
        let (digit, _) = argmax_with_confidence(&probs);
        assert_eq!(digit, 4);
    }
}
