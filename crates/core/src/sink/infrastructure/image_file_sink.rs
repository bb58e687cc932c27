use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::sink::domain::display_sink::DisplaySink;

/// Writes each pushed frame to a single image file, overwriting the
/// previous one. The file always holds the most recent frame, which
/// makes it a minimal live view for pollers and a natural fit for
/// single-image runs.
pub struct ImageFileSink {
    path: PathBuf,
    opened: bool,
}

impl ImageFileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            opened: false,
        }
    }
}

impl DisplaySink for ImageFileSink {
    fn open(&mut self, _metadata: &SourceMetadata) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(SinkError::Open(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }
        self.opened = true;
        Ok(())
    }

    fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if !self.opened {
            return Err(SinkError::Push("sink not opened".into()));
        }
        let buffer = image::RgbImage::from_raw(
            frame.width(),
            frame.height(),
            frame.data().to_vec(),
        )
        .ok_or_else(|| SinkError::Push("frame buffer size mismatch".into()))?;
        buffer
            .save(&self.path)
            .map_err(|e| SinkError::Push(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.opened = false;
        Ok(())
    }
}
