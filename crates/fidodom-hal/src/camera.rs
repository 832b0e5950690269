//! [`FrameSource`] trait and supporting types for image-capture hardware.

use fidodom_types::FusionError;

/// A raw image frame returned by a camera driver.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. RGB24 or greyscale).
    pub data: Vec<u8>,
    /// Capture time in seconds.
    pub stamp: f64,
    /// Optical frame of the camera that took the picture.
    pub frame_id: String,
}

/// Pinhole calibration delivered alongside every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    pub width: u32,
    pub height: u32,
    /// Row-major 3x3 intrinsic matrix.
    pub k: [f64; 9],
    /// Distortion coefficients (plumb-bob order).
    pub distortion: Vec<f64>,
}

impl CameraInfo {
    /// An undistorted pinhole model with focal length `f` and the principal
    /// point at the image centre.
    pub fn pinhole(width: u32, height: u32, f: f64) -> Self {
        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        Self {
            width,
            height,
            k: [f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0],
            distortion: vec![0.0; 5],
        }
    }
}

/// A frame plus its calibration, tagged with the sensor it came from.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub source_id: String,
    pub image: CameraFrame,
    pub calibration: CameraInfo,
}

/// An on-demand image source, e.g. a rear camera or a depth sensor's RGB
/// stream.
///
/// Drivers implement this trait and register themselves with a
/// [`SensorRegistry`][crate::registry::SensorRegistry].
pub trait FrameSource: Send {
    /// Stable identifier for this sensor, e.g. `"rear_cam"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SourceUnavailable`] if the frame cannot be
    /// captured (e.g. the device is disconnected or the service is down).
    fn fetch(&mut self) -> Result<CapturedFrame, FusionError>;
}
