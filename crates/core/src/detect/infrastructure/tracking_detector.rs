use crate::detect::domain::object_detector::ObjectDetector;
use crate::detect::infrastructure::iou_tracker::{IouTracker, TrackerVariant};
use crate::error::ModelError;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Decorator that assigns stable track ids to another detector's output.
///
/// Detections the tracker did not associate keep `track_id: None`, so a
/// weak detection still shows up annotated, just without an identity.
pub struct TrackingDetector {
    inner: Box<dyn ObjectDetector>,
    tracker: IouTracker,
}

impl TrackingDetector {
    pub fn new(inner: Box<dyn ObjectDetector>, variant: TrackerVariant) -> Self {
        Self {
            inner,
            tracker: IouTracker::new(variant),
        }
    }
}

impl ObjectDetector for TrackingDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ModelError> {
        let mut detections = self.inner.detect(frame)?;
        let tracks = self.tracker.update(&detections);
        for track in &tracks {
            if let Some(di) = track.det_index {
                if let Some(det) = detections.get_mut(di) {
                    det.track_id = Some(track.id);
                }
            }
        }
        Ok(detections)
    }
}
