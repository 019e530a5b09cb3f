//! Capture error types

use thiserror::Error;

use crate::device::Facing;
use crate::frame::BufferId;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("could not find a camera facing {0:?}")]
    NoCamera(Facing),

    #[error("could not find a suitable preview size")]
    NoSuitableSize,

    #[error("could not find a suitable preview fps range")]
    NoSuitableFpsRange,

    #[error("camera not initialized")]
    NotInitialized,

    #[error("unknown buffer {0} recycled - producer/consumer bookkeeping is broken")]
    UnknownBuffer(BufferId),

    #[error("buffer {0} recycled while not in use")]
    BufferNotInUse(BufferId),

    #[error("buffer pool exhausted ({0} buffers registered)")]
    PoolExhausted(usize),

    #[error("invalid frame size: {0}x{1}")]
    InvalidSize(u32, u32),

    #[error("capability not supported: {0}")]
    Unsupported(&'static str),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
