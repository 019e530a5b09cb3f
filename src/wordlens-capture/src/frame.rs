//! Frame buffers handed between the capture hardware and the recognizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a pooled buffer. Unique across every pool in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

impl BufferId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel layout of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Full-resolution luma plane followed by interleaved V/U at half resolution
    Nv21,
}

impl PixelFormat {
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Nv21 => 12,
        }
    }
}

/// Frame dimensions in sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes needed to hold one frame of `format`, plus one guard byte.
    pub fn buffer_len(&self, format: PixelFormat) -> usize {
        let bits = self.pixel_count() as u64 * format.bits_per_pixel() as u64;
        (bits.div_ceil(8) + 1) as usize
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clockwise rotation of the sensor image relative to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation used for every capture session
    pub const FIXED: Rotation = Rotation::Deg90;

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether width and height swap when shown upright
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// A pooled capture buffer plus the metadata needed to interpret it.
///
/// Frames are created only by [`crate::BufferPool`] and are deliberately not
/// `Clone`: a buffer identity has at most one owner at a time, and ownership
/// travels hardware -> mailbox -> worker -> pool.
pub struct Frame {
    id: BufferId,
    data: Box<[u8]>,
    size: FrameSize,
    format: PixelFormat,
    rotation: Rotation,
    timestamp: DateTime<Utc>,
}

impl Frame {
    pub(crate) fn new(id: BufferId, size: FrameSize, format: PixelFormat) -> Self {
        Self {
            id,
            data: vec![0u8; size.buffer_len(format)].into_boxed_slice(),
            size,
            format,
            rotation: Rotation::FIXED,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Writable view for the capture hardware (and for masking before recognition)
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Mark the frame as freshly filled by the hardware
    pub fn stamp(&mut self) {
        self.timestamp = Utc::now();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv21_buffer_len() {
        // 640 * 480 * 12 / 8 = 460800, plus the guard byte
        assert_eq!(FrameSize::new(640, 480).buffer_len(PixelFormat::Nv21), 460_801);
        // odd pixel counts round up
        assert_eq!(FrameSize::new(3, 1).buffer_len(PixelFormat::Nv21), 6);
    }

    #[test]
    fn test_rotation() {
        assert_eq!(Rotation::FIXED.degrees(), 90);
        assert!(Rotation::FIXED.is_transposed());
        assert!(!Rotation::Deg180.is_transposed());
    }
}
