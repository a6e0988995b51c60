use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no camera with index {0}")]
    NoSuchCamera(usize),

    #[error("failed to open camera {index}: {reason}")]
    Open { index: usize, reason: String },

    #[error("camera rejected parameters: {0}")]
    Parameters(String),

    #[error("no camera is open")]
    NotOpen,

    #[error("failed to attach preview surface: {0}")]
    Surface(String),

    #[error("preview error: {0}")]
    Preview(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("capture already in progress")]
    CaptureInProgress,

    #[error("capture not delivered within {0:?}")]
    CaptureTimeout(Duration),

    #[error("failed to decode picture")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode picture")]
    Encode(#[source] image::ImageError),

    #[error("failed to write {path}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CameraError {
    #[inline]
    pub fn open(index: usize, reason: impl Into<String>) -> Self {
        Self::Open {
            index,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn save(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Save {
            path: path.into(),
            source,
        }
    }
}
