use std::path::Path;

use crate::error::SourceError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Normalizes access to a bounded or unbounded sequence of raw frames,
/// regardless of origin (local file, webcam device, or network stream).
///
/// `target` is a filesystem path for file and device sources, or a URL
/// for network sources. A source is restartable only by re-opening it.
pub trait FrameSource: Send {
    /// Opens the source and returns its metadata. Fails with
    /// [`SourceError::Unavailable`] when the file/device/URL cannot be
    /// opened; in that case no handle is held.
    fn open(&mut self, target: &Path) -> Result<SourceMetadata, SourceError>;

    /// Lazy iterator over frames in decode order. Iterator exhaustion is
    /// the end-of-stream sentinel; an `Err` item aborts the current run.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_>;

    /// Releases the underlying handle. Idempotent: safe to call on an
    /// unopened or already-closed source.
    fn close(&mut self);
}
