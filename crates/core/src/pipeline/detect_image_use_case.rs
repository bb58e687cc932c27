use std::path::Path;

use crate::error::{SourceError, StreamError};
use crate::pipeline::invoker::DetectionInvoker;
use crate::sink::domain::display_sink::DisplaySink;
use crate::source::domain::frame_source::FrameSource;

/// Single-image pipeline: read → detect → annotate → write.
///
/// Returns the detections so callers can list them alongside the
/// annotated output.
pub struct DetectImageUseCase {
    source: Box<dyn FrameSource>,
    invoker: DetectionInvoker,
    sink: Box<dyn DisplaySink>,
}

impl DetectImageUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        invoker: DetectionInvoker,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            source,
            invoker,
            sink,
        }
    }

    pub fn execute(
        &mut self,
        target: &Path,
    ) -> Result<Vec<crate::shared::detection::Detection>, StreamError> {
        let metadata = self.source.open(target)?;

        let frame = match self.source.frames().next() {
            Some(result) => result,
            None => Err(SourceError::Decode {
                index: 0,
                reason: "source produced no frames".into(),
            }),
        };
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                self.source.close();
                return Err(e.into());
            }
        };
        self.source.close();

        let (annotated, detections) = self.invoker.infer(&frame)?;

        if let Err(e) = self.sink.open(&metadata) {
            return Err(e.into());
        }
        let push_result = self.sink.push(&annotated);
        let close_result = self.sink.close();
        push_result?;
        close_result?;

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::domain::frame_annotator::FrameAnnotator;
    use crate::detect::domain::object_detector::ObjectDetector;
    use crate::error::{ModelError, SinkError};
    use crate::shared::classes::class_label;
    use crate::shared::detection::{BoundingBox, Detection};
    use crate::shared::frame::Frame;
    use crate::shared::source_metadata::SourceMetadata;
    use std::sync::{Arc, Mutex};

    struct StubImageSource {
        frame: Option<Frame>,
    }

    impl StubImageSource {
        fn new(frame: Frame) -> Self {
            Self { frame: Some(frame) }
        }
    }

    impl FrameSource for StubImageSource {
        fn open(&mut self, _target: &Path) -> Result<SourceMetadata, SourceError> {
            let frame = self.frame.as_ref().expect("stub opened twice");
            Ok(SourceMetadata {
                width: frame.width(),
                height: frame.height(),
                fps: 0.0,
                total_frames: Some(1),
                codec: String::new(),
                origin: None,
            })
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
            Box::new(self.frame.take().into_iter().map(Ok))
        }

        fn close(&mut self) {
            self.frame = None;
        }
    }

    struct StubSink {
        pushed: Arc<Mutex<Vec<Frame>>>,
    }

    impl StubSink {
        fn new() -> Self {
            Self {
                pushed: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl DisplaySink for StubSink {
        fn open(&mut self, _metadata: &SourceMetadata) -> Result<(), SinkError> {
            Ok(())
        }

        fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
            self.pushed.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    struct StubDetector {
        detections: Vec<Detection>,
    }

    impl ObjectDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, ModelError> {
            Ok(self.detections.clone())
        }
    }

    struct NoopAnnotator;

    impl FrameAnnotator for NoopAnnotator {
        fn annotate(&self, _frame: &mut Frame, _detections: &[Detection]) {}
    }

    fn make_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn det(score: f64) -> Detection {
        Detection {
            bbox: BoundingBox::new(10.0, 10.0, 40.0, 40.0),
            class_id: 0,
            label: class_label(0).to_string(),
            score,
            track_id: None,
        }
    }

    fn make_use_case(detections: Vec<Detection>, confidence: f64) -> (DetectImageUseCase, Arc<Mutex<Vec<Frame>>>) {
        let sink = StubSink::new();
        let pushed = sink.pushed.clone();
        let uc = DetectImageUseCase::new(
            Box::new(StubImageSource::new(make_frame(100, 100))),
            DetectionInvoker::new(
                Box::new(StubDetector { detections }),
                Box::new(NoopAnnotator),
                confidence,
            ),
            Box::new(sink),
        );
        (uc, pushed)
    }

    #[test]
    fn test_returns_detections_above_threshold() {
        let (mut uc, _) = make_use_case(vec![det(0.9), det(0.2)], 0.4);
        let detections = uc.execute(Path::new("in.png")).unwrap();
        assert_eq!(detections.len(), 1);
        assert!((detections[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_pushes_exactly_one_frame() {
        let (mut uc, pushed) = make_use_case(vec![det(0.9)], 0.4);
        uc.execute(Path::new("in.png")).unwrap();
        assert_eq!(pushed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_output_dimensions_preserved() {
        let (mut uc, pushed) = make_use_case(vec![], 0.4);
        uc.execute(Path::new("in.png")).unwrap();
        let pushed = pushed.lock().unwrap();
        assert_eq!(pushed[0].width(), 100);
        assert_eq!(pushed[0].height(), 100);
    }

    #[test]
    fn test_no_detections_still_writes_output() {
        let (mut uc, pushed) = make_use_case(vec![], 0.4);
        let detections = uc.execute(Path::new("in.png")).unwrap();
        assert!(detections.is_empty());
        assert_eq!(pushed.lock().unwrap().len(), 1);
    }
}
