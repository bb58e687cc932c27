use crate::error::SinkError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Receives annotated frames one at a time.
///
/// Each `push` replaces the previous frame from the sink's point of view;
/// a file-backed sink may accumulate them into a video, a display-backed
/// sink shows only the latest. `close` must be safe to call more than
/// once and on a sink that was never opened.
pub trait DisplaySink: Send {
    fn open(&mut self, metadata: &SourceMetadata) -> Result<(), SinkError>;
    fn push(&mut self, frame: &Frame) -> Result<(), SinkError>;
    fn close(&mut self) -> Result<(), SinkError>;
}
