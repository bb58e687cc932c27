use crate::annotate::domain::frame_annotator::FrameAnnotator;
use crate::detect::domain::object_detector::ObjectDetector;
use crate::error::ModelError;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Runs detection on a frame and renders the surviving detections onto
/// a copy of it.
///
/// The confidence threshold is applied here, after the detector and any
/// tracking decorator have seen the full candidate list, so tracking can
/// exploit weak detections that never reach the display.
pub struct DetectionInvoker {
    detector: Box<dyn ObjectDetector>,
    annotator: Box<dyn FrameAnnotator>,
    confidence: f64,
}

impl DetectionInvoker {
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        annotator: Box<dyn FrameAnnotator>,
        confidence: f64,
    ) -> Self {
        Self {
            detector,
            annotator,
            confidence,
        }
    }

    /// Returns the annotated frame and the detections drawn onto it,
    /// strongest first.
    pub fn infer(&mut self, frame: &Frame) -> Result<(Frame, Vec<Detection>), ModelError> {
        let mut detections = self.detector.detect(frame)?;
        detections.retain(|d| d.score >= self.confidence);
        detections.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut annotated = frame.clone();
        self.annotator.annotate(&mut annotated, &detections);
        Ok((annotated, detections))
    }
}
