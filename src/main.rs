//! Digit Lens - handwritten digit recognition
//!
//! Two front-ends over one pre-trained classifier: an interactive drawing
//! canvas and a live webcam recognizer.

mod canvas;
mod capture;
mod config;
mod live;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::canvas::CanvasSession;
use crate::capture::Webcam;
use crate::config::AppConfig;
use crate::vision::{DigitClassifier, ModelManager, Recognizer};

/// Digit Lens - handwritten digit recognition
#[derive(Parser, Debug)]
#[command(name = "digit-lens")]
#[command(about = "Recognize handwritten digits from a drawing canvas or a webcam")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the drawing canvas (default)
    Canvas,
    /// Recognize digits live from a webcam
    Live {
        /// Capture device index
        #[arg(short, long)]
        camera: Option<u32>,
    },
    /// Download and cache the classifier model
    FetchModel,
    /// List available capture devices and exit
    ListCameras,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_or_create_config();

    match args.command.unwrap_or(Command::Canvas) {
        Command::ListCameras => {
            let cameras = capture::list_cameras();
            if cameras.is_empty() {
                println!("No capture devices detected");
            } else {
                println!("Available capture devices:");
                for camera in &cameras {
                    println!("  [{}] {}", camera.index, camera.name);
                }
            }
        }
        Command::FetchModel => {
            let manager = ModelManager::new()?;
            let path = manager.ensure_model()?;
            info!("Classifier model ready at {:?}", path);
        }
        Command::Canvas => {
            info!("Starting drawing canvas");
            let recognizer = build_recognizer(&config, config.preprocess.center_canvas)?;
            let session =
                CanvasSession::new(config.canvas.side, config.canvas.brush_width);
            if let Err(e) = canvas::run_canvas(session, recognizer) {
                error!("Canvas window error: {}", e);
            }
        }
        Command::Live { camera } => {
            let index = camera.unwrap_or(config.camera.index);
            info!("Starting live recognition on camera {}", index);

            let recognizer = build_recognizer(&config, config.preprocess.center_live)?;
            // Camera open failure is fatal; per-frame failures later only
            // end the loop.
            let webcam = Webcam::open(index)?;
            if let Err(e) = live::run_live(Box::new(webcam), recognizer, config.localize.clone()) {
                error!("Live window error: {}", e);
            }
        }
    }

    Ok(())
}

/// Load configuration from the platform config dir or fall back to defaults
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Resolve the model file and wrap it in a recognizer.
fn build_recognizer(config: &AppConfig, center: bool) -> Result<Recognizer> {
    let model_path = match &config.model.path {
        Some(path) => path.clone(),
        None => ModelManager::new()?.ensure_model()?,
    };

    let classifier = DigitClassifier::load(&model_path, config.model.apply_softmax)
        .context("Startup aborted: classifier unavailable")?;

    Ok(Recognizer::new(classifier, center))
}
