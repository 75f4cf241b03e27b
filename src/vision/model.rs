//! Classifier model acquisition and caching
//!
//! The network itself is trained and exported by the external ML
//! toolchain; this module owns the persisted artifact: downloading the
//! pretrained MNIST ONNX graph, caching it under the data directory, and
//! tracking it in a small manifest.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Filename of the cached classifier.
pub const MODEL_FILENAME: &str = "digits.onnx";

/// Pretrained MNIST classifier from the ONNX model zoo.
const MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/classification/mnist/model/mnist-12.onnx";

/// Plausible size range for the downloaded file, in bytes.
const EXPECTED_SIZE_RANGE: (u64, u64) = (10_000, 500_000);

/// Manifest tracking the downloaded model
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: Option<String>,
    pub downloaded_at: String,
}

/// Manager for downloading and caching the classifier model
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a model manager rooted at the platform data directory
    pub fn new() -> Result<Self> {
        let data_dir = crate::storage::get_data_dir()?;
        Self::with_dir(data_dir.join("models"))
    }

    /// Create a model manager with a custom directory
    pub fn with_dir(models_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    /// Path to the classifier file
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(MODEL_FILENAME)
    }

    /// Check whether the classifier is already cached and plausible
    pub fn is_model_available(&self) -> bool {
        let path = self.model_path();
        if !path.exists() {
            return false;
        }

        if let Ok(metadata) = std::fs::metadata(&path) {
            let (min, max) = EXPECTED_SIZE_RANGE;
            let size = metadata.len();
            size >= min && size <= max
        } else {
            false
        }
    }

    /// Download the classifier if it is not already cached.
    /// Returns the path to the model file.
    pub fn ensure_model(&self) -> Result<PathBuf> {
        let path = self.model_path();

        if self.is_model_available() {
            info!("Digit model already available at {:?}", path);
            return Ok(path);
        }

        info!("Downloading digit model...");
        self.download_model()?;

        Ok(path)
    }

    /// Download the classifier (blocking)
    fn download_model(&self) -> Result<()> {
        let path = self.model_path();

        info!("Downloading digit model from {}", MODEL_URL);

        if std::env::var("DIGIT_LENS_OFFLINE").is_ok() {
            anyhow::bail!(
                "Offline mode: cannot download the model. Download it manually from {} and place it at {:?}",
                MODEL_URL,
                path
            );
        }

        let rt = Runtime::new().context("Failed to create tokio runtime")?;
        rt.block_on(async { self.download_file_async(MODEL_URL, &path).await })?;

        if !self.is_model_available() {
            anyhow::bail!("Download completed but model verification failed");
        }

        self.update_manifest()?;

        info!("Successfully downloaded digit model");
        Ok(())
    }

    /// Async download implementation
    async fn download_file_async(&self, url: &str, path: &Path) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to send download request")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}: {}", response.status(), url);
        }

        let total_size = response.content_length();
        debug!("Download size: {:?} bytes", total_size);

        // Stream into a temp file, move into place only when complete.
        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).context("Failed to create temp file")?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading download stream")?;
            file.write_all(&chunk).context("Failed to write to temp file")?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }

        file.flush().context("Failed to flush temp file")?;
        drop(file);

        let hash = format!("{:x}", hasher.finalize());
        debug!("Downloaded {} bytes, sha256 {}", downloaded, hash);

        std::fs::rename(&temp_path, path)
            .context("Failed to move downloaded file to final location")?;

        Ok(())
    }

    /// Record the cached model in the manifest
    fn update_manifest(&self) -> Result<()> {
        let mut manifest = self.load_manifest().unwrap_or_default();

        let path = self.model_path();
        let metadata = std::fs::metadata(&path)?;

        let hash = {
            let data = std::fs::read(&path)?;
            let mut hasher = Sha256::new();
            hasher.update(&data);
            format!("{:x}", hasher.finalize())
        };

        let model_info = ModelInfo {
            filename: MODEL_FILENAME.to_string(),
            size_bytes: metadata.len(),
            sha256: Some(hash),
            downloaded_at: unix_timestamp(),
        };

        if let Some(existing) = manifest
            .models
            .iter_mut()
            .find(|m| m.filename == model_info.filename)
        {
            *existing = model_info;
        } else {
            manifest.models.push(model_info);
        }

        self.save_manifest(&manifest)?;
        Ok(())
    }

    /// Load the model manifest
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let manifest_path = self.models_dir.join("manifest.json");
        if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)?;
            let manifest: ModelManifest = serde_json::from_str(&content)?;
            Ok(manifest)
        } else {
            Ok(ModelManifest::default())
        }
    }

    /// Save the model manifest
    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        let manifest_path = self.models_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(manifest_path, content)?;
        Ok(())
    }
}

/// Current Unix timestamp as a string
fn unix_timestamp() -> String {
    use std::time::SystemTime;

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    format!("{}", now)
}
