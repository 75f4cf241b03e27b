//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::LocalizerConfig;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Classifier model settings
    pub model: ModelSettings,
    /// Preprocessing settings
    pub preprocess: PreprocessSettings,
    /// Digit localization settings (live front-end)
    pub localize: LocalizerConfig,
    /// Camera settings
    pub camera: CameraSettings,
    /// Drawing canvas settings
    pub canvas: CanvasSettings,
}

/// Classifier model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Explicit model path, or None to use the cached download
    pub path: Option<PathBuf>,
    /// Apply softmax to the model output (set when the exported graph
    /// ends in raw logits)
    pub apply_softmax: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: None,
            apply_softmax: true,
        }
    }
}

/// Preprocessing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessSettings {
    /// Mean-center canvas images before inference
    pub center_canvas: bool,
    /// Mean-center camera crops before inference (camera captures are
    /// noisier, centering evens out stroke-intensity variance)
    pub center_live: bool,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            center_canvas: false,
            center_live: true,
        }
    }
}

/// Camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Capture device index
    pub index: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self { index: 0 }
    }
}

/// Drawing canvas settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Side length of the square drawing surface in pixels
    pub side: u32,
    /// Brush stroke width in pixels
    pub brush_width: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            side: 400,
            brush_width: 15,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!(config.model.path.is_none());
        assert!(config.model.apply_softmax);

        assert!(!config.preprocess.center_canvas);
        assert!(config.preprocess.center_live);

        assert_eq!(config.localize.block_radius, 5);
        assert_eq!(config.localize.min_region_side, 5);

        assert_eq!(config.camera.index, 0);

        assert_eq!(config.canvas.side, 400);
        assert_eq!(config.canvas.brush_width, 15);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.model.apply_softmax, config.model.apply_softmax);
        assert_eq!(parsed.preprocess.center_live, config.preprocess.center_live);
        assert_eq!(parsed.localize.block_radius, config.localize.block_radius);
        assert_eq!(parsed.canvas.side, config.canvas.side);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.model.path = Some(PathBuf::from("/tmp/custom.onnx"));
        config.camera.index = 2;
        config.localize.min_region_side = 8;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.model.path, Some(PathBuf::from("/tmp/custom.onnx")));
        assert_eq!(parsed.camera.index, 2);
        assert_eq!(parsed.localize.min_region_side, 8);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.camera.index, config.camera.index);
        assert_eq!(loaded.canvas.brush_width, config.canvas.brush_width);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
