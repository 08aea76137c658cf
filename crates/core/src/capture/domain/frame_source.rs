use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera unavailable ({device}): {reason}")]
    CameraUnavailable { device: String, reason: String },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("frame source has not been opened")]
    NotOpened,
}

/// What the caller asks of the camera. Dimensions and frame rate are hints;
/// the opened stream reports what it actually delivers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamRequest {
    /// Device name or file path. `None` selects the platform default camera.
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

/// A live stream of video frames. Video only: audio is never requested.
pub trait FrameSource: Send {
    fn open(&mut self, request: &StreamRequest) -> Result<StreamMetadata, CaptureError>;

    /// Returns `None` once the stream has ended.
    fn next_frame(&mut self) -> Option<Result<Frame, CaptureError>>;

    fn close(&mut self);
}
