use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::source::domain::frame_source::FrameSource;

/// Treats a still image file as a one-frame stream, so image targets
/// flow through the same loop as video without a separate code path.
pub struct ImageSource {
    path: Option<PathBuf>,
    metadata: Option<SourceMetadata>,
    consumed: bool,
}

impl ImageSource {
    pub fn new() -> Self {
        Self {
            path: None,
            metadata: None,
            consumed: false,
        }
    }
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ImageSource {
    fn open(&mut self, target: &Path) -> Result<SourceMetadata, SourceError> {
        let img = image::open(target)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", target.display())))?;

        let metadata = SourceMetadata {
            width: img.width(),
            height: img.height(),
            fps: 0.0,
            total_frames: Some(1),
            codec: String::new(),
            origin: Some(target.to_string_lossy().into_owned()),
        };

        self.path = Some(target.to_path_buf());
        self.metadata = Some(metadata.clone());
        self.consumed = false;

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
        let Some(path) = self.path.clone() else {
            return Box::new(std::iter::once(Err(SourceError::NotOpened)));
        };

        if self.consumed {
            return Box::new(std::iter::empty());
        }
        self.consumed = true;

        let result = image::open(&path)
            .map_err(|e| SourceError::Decode {
                index: 0,
                reason: e.to_string(),
            })
            .map(|img| {
                let rgb = img.to_rgb8();
                let (width, height) = rgb.dimensions();
                Frame::new(rgb.into_raw(), width, height, 3, 0)
            });

        Box::new(std::iter::once(result))
    }

    fn close(&mut self) {
        self.path = None;
        self.metadata = None;
        self.consumed = false;
    }
}
