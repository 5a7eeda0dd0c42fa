use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open camera {index}: {reason}")]
    CameraOpen { index: u32, reason: String },
    #[error("failed to capture image: {0}")]
    Capture(String),
    #[error("failed to load model: {0}")]
    Model(String),
    #[error("model file {path:?} not found and no download repository configured")]
    ModelNotFound { path: PathBuf },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("window error: {0}")]
    Window(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Error::Inference(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
