//! Camera capture layer
//!
//! Pulls color frames from a webcam one at a time. The device itself is a
//! pure I/O collaborator; the `FrameSource` trait is the seam that lets
//! the live loop run against a stub in tests.

pub mod frame;

pub use frame::VideoFrame;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced by the capture layer.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device could not be opened at all (fatal for the live run)
    #[error("could not access camera {index}: {source}")]
    Open {
        index: u32,
        #[source]
        source: nokhwa::NokhwaError,
    },
    /// A single frame read failed (treated as end-of-stream)
    #[error("failed to capture frame: {0}")]
    Read(#[from] nokhwa::NokhwaError),
}

/// A sequential source of color frames.
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// An error here means the stream is over; callers end their loop
    /// rather than retry.
    fn next_frame(&mut self) -> Result<VideoFrame, CaptureError>;
}

/// Webcam-backed frame source.
pub struct Webcam {
    camera: Camera,
}

impl Webcam {
    /// Open the camera at `index` and start streaming.
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|source| CaptureError::Open { index, source })?;
        camera
            .open_stream()
            .map_err(|source| CaptureError::Open { index, source })?;

        let format = camera.camera_format();
        info!(
            "Camera {} opened: {}x{} @ {} fps",
            index,
            format.width(),
            format.height(),
            format.frame_rate()
        );

        Ok(Self { camera })
    }
}

impl FrameSource for Webcam {
    fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        let buffer = self.camera.frame()?;
        let decoded = buffer.decode_image::<RgbFormat>()?;
        let (width, height) = decoded.dimensions();
        Ok(VideoFrame::new(decoded.into_raw(), width, height))
    }
}

/// Information about an available capture device.
#[derive(Debug, Clone)]
pub struct CameraDescriptor {
    pub index: u32,
    pub name: String,
}

/// Enumerate available capture devices.
pub fn list_cameras() -> Vec<CameraDescriptor> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(devices) => devices
            .into_iter()
            .enumerate()
            .map(|(i, info)| CameraDescriptor {
                index: i as u32,
                name: info.human_name(),
            })
            .collect(),
        Err(e) => {
            warn!("Camera enumeration failed: {}", e);
            Vec::new()
        }
    }
}
