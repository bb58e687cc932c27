use crate::error::ModelError;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Runs object detection on a single frame.
///
/// Implementations return raw detections in frame pixel coordinates.
/// Track assignment and thresholding happen in the layers above.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ModelError>;
}
