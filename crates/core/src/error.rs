use std::path::PathBuf;

use thiserror::Error;

/// Frame acquisition failures.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The target could not be opened at all: missing file, unreachable
    /// host, busy device.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The target opened but a frame could not be decoded.
    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
    #[error("source not opened")]
    NotOpened,
}

/// Detection model failures.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Output delivery failures.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to open sink: {0}")]
    Open(String),
    #[error("failed to push frame: {0}")]
    Push(String),
}

/// Anything that can end a run early. Each component failure keeps its
/// own type so callers can tell a bad source apart from a broken model.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
