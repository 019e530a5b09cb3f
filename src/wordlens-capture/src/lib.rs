//! wordlens-capture - Camera frame plumbing for WordLens
//!
//! Owns the reusable frame buffers handed to the capture hardware, the
//! newest-wins mailbox between the capture callback and the processing
//! worker, and the focus/flash/zoom control state.

pub mod controls;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod mailbox;
pub mod pool;
pub mod replay;

pub use controls::{Capability, Control, ControlEvent, ControlListener, HardwareControls, DEFAULT_ZOOM_RATIO};
pub use device::{
    select_fps_range, select_size, CameraDevice, CameraOpener, CaptureSettings,
    DeviceCapabilities, Facing, FocusCallback, FocusMode, FpsRange, FrameSink,
};
pub use error::CaptureError;
pub use frame::{BufferId, Frame, FrameSize, PixelFormat, Rotation};
pub use geometry::{Rect, RectF};
pub use mailbox::FrameMailbox;
pub use pool::BufferPool;
pub use replay::{ReplayCamera, ReplayOpener};
