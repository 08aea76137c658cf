use thiserror::Error;

use crate::detection::domain::detection_frame::DetectionFrame;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model output signature mismatch: {0}")]
    OutputSignature(String),
    #[error("unsupported model input: {0}")]
    InputShape(String),
    #[error("malformed detection output: {boxes} box values, {classes} classes, {scores} scores")]
    MalformedFrame {
        boxes: usize,
        classes: usize,
        scores: usize,
    },
}

/// Domain interface for the opaque mask detection model.
///
/// `&mut self` because inference sessions are not shareable mid-run.
pub trait MaskDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionFrame, DetectionError>;
}
