// src/camera.rs - live capture, only built with the `camera` feature
//
// Library entry point for hosts that bring their own hand landmark model.
// `open_source` cannot build one because no detector ships with the crate;
// hand a `CameraSource` to `spawn_landmark_source` instead:
//
//     spawn_landmark_source(move || Box::new(CameraSource::new(0, detector)), 30)
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::landmarks::{HandFrame, LandmarkSource};

/// The hand landmark model. Given one camera frame, report zero or one hand.
pub trait HandDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<HandFrame>>;
}

/// Names of the cameras the platform reports.
pub fn list_cameras() -> Result<Vec<String>> {
    let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| Error::SourceInit(e.to_string()))?;
    Ok(cameras.iter().map(|c| c.human_name()).collect())
}

/// Captures frames from a camera and runs them through a detector.
/// The camera is opened in `start` and released in `stop`.
pub struct CameraSource<D: HandDetector> {
    index: u32,
    detector: D,
    camera: Option<Camera>,
}

impl<D: HandDetector> CameraSource<D> {
    pub fn new(index: u32, detector: D) -> Self {
        Self {
            index,
            detector,
            camera: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.camera.is_some()
    }
}

impl<D: HandDetector> LandmarkSource for CameraSource<D> {
    fn name(&self) -> &str {
        "camera"
    }

    fn start(&mut self) -> Result<()> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| Error::SourceInit(format!("failed to open camera {}: {}", self.index, e)))?;
        camera
            .open_stream()
            .map_err(|e| Error::SourceInit(format!("failed to open camera stream: {}", e)))?;
        info!(index = self.index, "camera stream open");
        self.camera = Some(camera);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<HandFrame>> {
        let camera = self.camera.as_mut().ok_or(Error::NoCamera)?;
        let frame = camera
            .frame()
            .map_err(|e| Error::Inference(format!("failed to capture frame: {}", e)))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Inference(format!("failed to decode frame: {}", e)))?;
        self.detector.detect(&decoded)
    }

    fn stop(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            let _ = camera.stop_stream();
            debug!(index = self.index, "camera released");
        }
    }
}

impl<D: HandDetector> Drop for CameraSource<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
