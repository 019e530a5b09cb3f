//! Capture hardware boundary and preview format selection

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::CaptureError;
use crate::frame::{Frame, FrameSize, PixelFormat, Rotation};
use crate::geometry::Rect;
use crate::pool::BufferPool;

/// Preview size requested when nothing else is configured
pub const REQUESTED_PREVIEW_SIZE: FrameSize = FrameSize { width: 640, height: 480 };

/// Preview frame rate requested when nothing else is configured
pub const REQUESTED_FPS: f32 = 20.0;

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Back,
    Front,
}

/// Supported preview frame-rate range, in frames per second times 1000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn fixed(fps: u32) -> Self {
        Self::new(fps * 1000, fps * 1000)
    }
}

/// Focus behaviour applied by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Fixed,
    Macro,
}

/// What the opened device can do, queried once at open time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCapabilities {
    pub max_focus_areas: u32,
    pub supports_macro_focus: bool,
    pub supports_torch: bool,
    /// Zoom ratio per zoom step, in percent (step 0 is 100)
    pub zoom_ratios: Vec<u32>,
}

/// Parameters applied by [`CameraDevice::configure`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub size: FrameSize,
    pub fps_range: FpsRange,
    pub format: PixelFormat,
    pub rotation: Rotation,
}

/// Receives filled buffers from the hardware callback thread.
///
/// Implementations may only publish into the mailbox or recycle into the pool.
pub trait FrameSink: Send + Sync {
    fn on_frame_available(&self, frame: Frame);
}

/// One-shot autofocus completion, invoked on a hardware thread
pub type FocusCallback = Box<dyn FnOnce(bool) + Send>;

/// An opened camera
pub trait CameraDevice: Send {
    fn supported_sizes(&self) -> Vec<FrameSize>;

    fn supported_fps_ranges(&self) -> Vec<FpsRange>;

    fn capabilities(&self) -> DeviceCapabilities;

    fn configure(&mut self, settings: &CaptureSettings) -> Result<(), CaptureError>;

    /// Begin streaming. The device pulls empty buffers from `pool` and hands
    /// each filled one to `sink`; with no free buffer the frame is skipped.
    fn start(&mut self, pool: Arc<BufferPool>, sink: Arc<dyn FrameSink>) -> Result<(), CaptureError>;

    /// Stop streaming and release the hardware. Must not call into the sink afterwards.
    fn stop(&mut self);

    fn set_flash(&mut self, on: bool) -> Result<(), CaptureError>;

    fn set_zoom_step(&mut self, step: u32) -> Result<(), CaptureError>;

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CaptureError>;

    /// Set the metering/focus area in frame-pixel coordinates
    fn set_focus_area(&mut self, area: Rect) -> Result<(), CaptureError>;

    /// Run a single autofocus pass; `callback` reports success
    fn auto_focus(&mut self, callback: FocusCallback) -> Result<(), CaptureError>;
}

/// Opens capture hardware
pub trait CameraOpener {
    fn open(&self, facing: Facing) -> Result<Box<dyn CameraDevice>, CaptureError>;
}

/// Pick the supported size closest to `requested` (Manhattan distance).
/// On ties the first listed size wins.
pub fn select_size(sizes: &[FrameSize], requested: FrameSize) -> Result<FrameSize, CaptureError> {
    let selected = sizes
        .iter()
        .copied()
        .min_by_key(|size| {
            size.width.abs_diff(requested.width) + size.height.abs_diff(requested.height)
        })
        .ok_or(CaptureError::NoSuitableSize)?;

    debug!("selected preview size {} (requested {})", selected, requested);
    Ok(selected)
}

/// Pick the supported fps range whose bounds are closest to `requested_fps`.
/// On ties the first listed range wins.
pub fn select_fps_range(ranges: &[FpsRange], requested_fps: f32) -> Result<FpsRange, CaptureError> {
    let desired = (requested_fps * 1000.0) as i64;
    let selected = ranges
        .iter()
        .copied()
        .min_by_key(|range| (desired - range.min as i64).abs() + (desired - range.max as i64).abs())
        .ok_or(CaptureError::NoSuitableFpsRange)?;

    debug!(
        "selected fps range {:.1} ~ {:.1}",
        selected.min as f32 / 1000.0,
        selected.max as f32 / 1000.0
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_nearest_size() {
        let sizes = [
            FrameSize::new(1920, 1080),
            FrameSize::new(800, 600),
            FrameSize::new(640, 360),
            FrameSize::new(320, 240),
        ];
        let selected = select_size(&sizes, REQUESTED_PREVIEW_SIZE).unwrap();
        assert_eq!(selected, FrameSize::new(640, 360));
    }

    #[test]
    fn test_select_size_tie_keeps_first() {
        let sizes = [FrameSize::new(650, 480), FrameSize::new(630, 480)];
        assert_eq!(select_size(&sizes, REQUESTED_PREVIEW_SIZE).unwrap(), sizes[0]);
    }

    #[test]
    fn test_select_size_empty() {
        assert!(matches!(
            select_size(&[], REQUESTED_PREVIEW_SIZE),
            Err(CaptureError::NoSuitableSize)
        ));
    }

    #[test]
    fn test_select_fps_range() {
        let ranges = [
            FpsRange::new(15_000, 15_000),
            FpsRange::new(15_000, 30_000),
            FpsRange::new(20_000, 20_000),
            FpsRange::new(30_000, 30_000),
        ];
        assert_eq!(
            select_fps_range(&ranges, REQUESTED_FPS).unwrap(),
            FpsRange::new(20_000, 20_000)
        );
        assert!(select_fps_range(&[], REQUESTED_FPS).is_err());
    }
}
