//! Scanner orchestration
//!
//! Owns one camera session at a time: device, buffer pool, mailbox,
//! hardware controls and the processing worker. Start is all-or-nothing
//! and stop tears things down worker first, device second.

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use wordlens_capture::{
    select_fps_range, select_size, BufferPool, CameraDevice, CameraOpener, CaptureError,
    CaptureSettings, Control, ControlListener, FocusCallback, Frame, FrameMailbox, FrameSink,
    FrameSize, HardwareControls, PixelFormat, Rect, Rotation,
};
use wordlens_ocr::{upright_to_buffer, CursorLayout, CursorSelector, Processor, Recognizer};

use crate::config::{CaptureConfig, CursorConfig};
use crate::events::{EventSender, ScanEvent};
use crate::worker::{Worker, WorkerContext, WorkerStats};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to start camera: {0}")]
    CameraStart(#[source] CaptureError),

    #[error("scanner is already running")]
    AlreadyRunning,

    #[error("scanner is not running")]
    NotRunning,
}

/// Capture callback target: every filled buffer goes to the mailbox
struct MailboxSink {
    mailbox: Arc<FrameMailbox>,
}

impl FrameSink for MailboxSink {
    fn on_frame_available(&self, frame: Frame) {
        if let Err(e) = self.mailbox.publish(frame) {
            warn!("failed to publish frame: {}", e);
        }
    }
}

/// Resources held while the camera is streaming
struct Session {
    device: Box<dyn CameraDevice>,
    controls: HardwareControls,
    settings: CaptureSettings,
    mailbox: Arc<FrameMailbox>,
    worker: Worker,
}

/// Frame dimensions as recognizers see them
fn upright_size(settings: &CaptureSettings) -> (u32, u32) {
    let size = settings.size;
    if settings.rotation.is_transposed() {
        (size.height, size.width)
    } else {
        (size.width, size.height)
    }
}

pub struct Scanner {
    capture: CaptureConfig,
    layout: CursorLayout,
    mask_outside_area: bool,
    processor: Arc<Processor>,
    cursor: Arc<RwLock<CursorSelector>>,
    view: Option<(u32, u32)>,
    runtime: Handle,
    events: EventSender,
    session: Option<Session>,
}

impl Scanner {
    pub fn new(
        capture: CaptureConfig,
        cursor: &CursorConfig,
        recognizer: Arc<dyn Recognizer>,
        runtime: Handle,
        events: EventSender,
    ) -> Self {
        let layout = cursor.layout();
        Self {
            capture,
            layout,
            mask_outside_area: cursor.mask_outside_area,
            processor: Arc::new(Processor::new(recognizer)),
            cursor: Arc::new(RwLock::new(CursorSelector::for_view(0.0, 0.0, &layout))),
            view: None,
            runtime,
            events,
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Open the camera and start streaming into the worker.
    ///
    /// On failure everything acquired so far is released and the error is
    /// reported once. There is no retry.
    pub fn start(&mut self, opener: &dyn CameraOpener) -> Result<(), ScanError> {
        if self.session.is_some() {
            return Err(ScanError::AlreadyRunning);
        }

        let session = self.open_session(opener).map_err(|e| {
            warn!("camera start failed: {}", e);
            self.cursor.write().reset_scale();
            ScanError::CameraStart(e)
        })?;

        info!(
            "scanner started at {} ({} buffers)",
            session.settings.size, self.capture.buffer_count
        );
        self.session = Some(session);

        if let Some((width, height)) = self.view {
            self.set_preview_geometry(width, height);
        }
        Ok(())
    }

    fn open_session(&self, opener: &dyn CameraOpener) -> Result<Session, CaptureError> {
        let mut device = opener.open(self.capture.facing)?;

        let requested = FrameSize::new(self.capture.width, self.capture.height);
        let size = select_size(&device.supported_sizes(), requested)?;
        let fps_range = select_fps_range(&device.supported_fps_ranges(), self.capture.fps)?;

        let settings = CaptureSettings {
            size,
            fps_range,
            format: PixelFormat::Nv21,
            rotation: Rotation::FIXED,
        };
        device.configure(&settings)?;

        let capabilities = device.capabilities();
        if capabilities.max_focus_areas > 0 {
            let area = Rect::centered(
                size.width as i32 / 2,
                size.height as i32 / 2,
                self.capture.focus_area_size,
            );
            if let Err(e) = device.set_focus_area(area) {
                warn!("failed to set default focus area: {}", e);
            }
        }

        let pool = Arc::new(BufferPool::new(size, PixelFormat::Nv21, self.capture.buffer_count)?);
        pool.prime()?;
        let mailbox = Arc::new(FrameMailbox::new(pool.clone()));

        let sender = self.events.clone();
        let listener: ControlListener = Arc::new(move |event| {
            // a dropped receiver only means nobody is listening any more
            let _ = sender.send(ScanEvent::Control(event));
        });
        let mut controls = HardwareControls::from_capabilities(&capabilities, self.capture.zoom_ratio, Some(listener));
        if controls.state(Control::Focus).is_supported() {
            controls.toggle_focus(device.as_mut(), true);
        }

        // no frame may be hit-tested against the previous session's scale
        {
            let mut cursor = self.cursor.write();
            match self.view {
                Some((view_width, view_height)) => {
                    let (camera_width, camera_height) = upright_size(&settings);
                    cursor.set_scale(camera_width, camera_height, view_width, view_height);
                }
                None => cursor.reset_scale(),
            }
        }

        let sink = Arc::new(MailboxSink { mailbox: mailbox.clone() });
        device.start(pool, sink)?;

        let context = WorkerContext {
            mailbox: mailbox.clone(),
            processor: self.processor.clone(),
            cursor: self.cursor.clone(),
            events: self.events.clone(),
            runtime: self.runtime.clone(),
        };
        let worker = match Worker::spawn(context) {
            Ok(worker) => worker,
            Err(e) => {
                mailbox.shutdown();
                device.stop();
                return Err(CaptureError::Io(e));
            }
        };

        Ok(Session {
            device,
            controls,
            settings,
            mailbox,
            worker,
        })
    }

    /// Stop the worker, then the device. A no-op when not running.
    ///
    /// The cursor keeps its view layout but loses its camera scale.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.worker.stop();
        session.device.stop();
        self.cursor.write().reset_scale();
        info!(
            "scanner stopped ({} frames published, {} dropped)",
            session.mailbox.published_count(),
            session.mailbox.dropped_count()
        );
    }

    /// Lay the overlay out for a `view_width` x `view_height` preview.
    ///
    /// Once streaming, the cursor is scaled to the upright frame and the
    /// hardware focus area follows it. Returns whether focus was triggered.
    pub fn set_preview_geometry(&mut self, view_width: u32, view_height: u32) -> bool {
        self.view = Some((view_width, view_height));

        let mut cursor = self.cursor.write();
        cursor.set_view_size(view_width as f32, view_height as f32, &self.layout);
        if !self.mask_outside_area {
            cursor.set_recognition_area(None);
        }

        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let (camera_width, camera_height) = upright_size(&session.settings);
        if !cursor.set_scale(camera_width, camera_height, view_width, view_height) {
            return false;
        }
        let Some(cursor_rect) = cursor.cursor_frame_rect() else {
            return false;
        };
        drop(cursor);

        let area = upright_to_buffer(cursor_rect, session.settings.rotation, session.settings.size)
            .clamp_to(session.settings.size.width, session.settings.size.height);
        debug!("focus area follows cursor: {:?}", area);
        session.controls.trigger_focus(session.device.as_mut(), area, None)
    }

    /// Re-run autofocus on the current cursor area.
    ///
    /// `on_finished` is called with the outcome if a pass actually starts.
    pub fn refocus(&mut self, on_finished: Option<FocusCallback>) -> bool {
        let Some(rect) = self.cursor.read().cursor_frame_rect() else {
            return false;
        };
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let area = upright_to_buffer(rect, session.settings.rotation, session.settings.size)
            .clamp_to(session.settings.size.width, session.settings.size.height);
        session.controls.trigger_focus(session.device.as_mut(), area, on_finished)
    }

    pub fn toggle_focus(&mut self, on: bool) -> Result<bool, ScanError> {
        let session = self.session.as_mut().ok_or(ScanError::NotRunning)?;
        Ok(session.controls.toggle_focus(session.device.as_mut(), on))
    }

    pub fn toggle_flash(&mut self, on: bool) -> Result<bool, ScanError> {
        let session = self.session.as_mut().ok_or(ScanError::NotRunning)?;
        Ok(session.controls.toggle_flash(session.device.as_mut(), on))
    }

    pub fn toggle_zoom(&mut self, on: bool) -> Result<bool, ScanError> {
        let session = self.session.as_mut().ok_or(ScanError::NotRunning)?;
        Ok(session.controls.toggle_zoom(session.device.as_mut(), on))
    }

    /// Zoom ratio used by the next "zoom on", in percent
    pub fn set_zoom_ratio(&mut self, ratio: u32) {
        self.capture.zoom_ratio = ratio;
        if let Some(session) = self.session.as_mut() {
            session.controls.set_zoom_ratio(ratio);
        }
    }

    pub fn capture_settings(&self) -> Option<CaptureSettings> {
        self.session.as_ref().map(|session| session.settings)
    }

    pub fn stats(&self) -> Option<Arc<WorkerStats>> {
        self.session.as_ref().map(|session| session.worker.stats().clone())
    }

    pub fn cursor(&self) -> &Arc<RwLock<CursorSelector>> {
        &self.cursor
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
    }
}
