/// Properties of an opened frame source.
///
/// Bounded sources (files, stills) report `total_frames`; live sources
/// (webcam, RTSP, resolved streaming URLs) report `None` and run until
/// cancellation or disconnect.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: Option<usize>,
    pub codec: String,
    /// The path or URL the source was opened from, as given by the caller.
    pub origin: Option<String>,
}

impl SourceMetadata {
    pub fn is_live(&self) -> bool {
        self.total_frames.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_source() {
        let meta = SourceMetadata {
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames: Some(900),
            codec: "h264".to_string(),
            origin: Some("/tmp/test.mp4".to_string()),
        };
        assert!(!meta.is_live());
        assert_eq!(meta.total_frames, Some(900));
    }

    #[test]
    fn test_live_source_has_no_frame_count() {
        let meta = SourceMetadata {
            width: 640,
            height: 480,
            fps: 25.0,
            total_frames: None,
            codec: "h264".to_string(),
            origin: Some("rtsp://camera.local/stream".to_string()),
        };
        assert!(meta.is_live());
    }

    #[test]
    fn test_still_image_is_single_frame() {
        // Stills are represented as a one-frame source with fps=0
        let meta = SourceMetadata {
            width: 800,
            height: 600,
            fps: 0.0,
            total_frames: Some(1),
            codec: "png".to_string(),
            origin: None,
        };
        assert!(!meta.is_live());
        assert_eq!(meta.total_frames, Some(1));
    }
}
