use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("frame conversion error: {0}")]
    Conversion(String),

    #[error("recognition failed: {0}")]
    Detection(String),

    #[error("failed to read detections: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OcrError>;
