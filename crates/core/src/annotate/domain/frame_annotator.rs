use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Draws detection overlays onto a frame in place.
///
/// Pure pixel manipulation, so it cannot fail.
pub trait FrameAnnotator: Send {
    fn annotate(&self, frame: &mut Frame, detections: &[Detection]);
}
