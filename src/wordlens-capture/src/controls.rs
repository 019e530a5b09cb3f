//! Focus, flash and zoom control state
//!
//! Each capability is a small state machine, independent of frame flow:
//! probing at open time decides `Unsupported` vs `Off`, and explicit toggles
//! move between `Off` and `On`. Toggling an unsupported capability is a no-op
//! that reports `false`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::device::{CameraDevice, DeviceCapabilities, FocusCallback, FocusMode};
use crate::error::CaptureError;
use crate::geometry::Rect;

/// Zoom ratio applied by "zoom on" when nothing else is configured, in percent
pub const DEFAULT_ZOOM_RATIO: u32 = 200;

/// State of one hardware capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Unsupported,
    Off,
    On,
}

impl Capability {
    pub fn is_supported(self) -> bool {
        self != Capability::Unsupported
    }

    pub fn is_on(self) -> bool {
        self == Capability::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Focus,
    Flash,
    Zoom,
}

/// Notifications emitted by [`HardwareControls`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Probing or a toggle moved a capability to a new state
    CapabilityChanged { control: Control, state: Capability },
    /// Result of an explicit toggle request
    Toggled { control: Control, on: bool, applied: bool },
    /// A triggered autofocus pass completed
    FocusFinished { success: bool },
}

pub type ControlListener = Arc<dyn Fn(ControlEvent) + Send + Sync>;

/// Hardware control state for one opened camera
pub struct HardwareControls {
    focus: Capability,
    flash: Capability,
    zoom: Capability,
    zoom_ratio: u32,
    zoom_ratios: Vec<u32>,
    focusing: Arc<AtomicBool>,
    listener: Option<ControlListener>,
}

impl HardwareControls {
    /// Build the control state from capabilities queried at open time
    pub fn from_capabilities(capabilities: &DeviceCapabilities, zoom_ratio: u32, listener: Option<ControlListener>) -> Self {
        let supported = |yes: bool| if yes { Capability::Off } else { Capability::Unsupported };

        let controls = Self {
            focus: supported(capabilities.supports_macro_focus && capabilities.max_focus_areas > 0),
            flash: supported(capabilities.supports_torch),
            zoom: supported(capabilities.zoom_ratios.len() > 1),
            zoom_ratio,
            zoom_ratios: capabilities.zoom_ratios.clone(),
            focusing: Arc::new(AtomicBool::new(false)),
            listener,
        };

        if !controls.focus.is_supported() {
            info!("camera auto focus is not supported on this device");
        }
        debug!(
            "detected controls: focus={:?} flash={:?} zoom={:?}",
            controls.focus, controls.flash, controls.zoom
        );

        controls.emit(ControlEvent::CapabilityChanged { control: Control::Focus, state: controls.focus });
        controls.emit(ControlEvent::CapabilityChanged { control: Control::Flash, state: controls.flash });
        controls.emit(ControlEvent::CapabilityChanged { control: Control::Zoom, state: controls.zoom });
        controls
    }

    pub fn state(&self, control: Control) -> Capability {
        match control {
            Control::Focus => self.focus,
            Control::Flash => self.flash,
            Control::Zoom => self.zoom,
        }
    }

    pub fn set_zoom_ratio(&mut self, ratio: u32) {
        self.zoom_ratio = ratio;
    }

    /// Whether an autofocus pass is currently running
    pub fn is_focusing(&self) -> bool {
        self.focusing.load(Ordering::Acquire)
    }

    pub fn toggle_focus(&mut self, device: &mut dyn CameraDevice, on: bool) -> bool {
        let mode = if on { FocusMode::Macro } else { FocusMode::Fixed };
        self.toggle(device, Control::Focus, on, |device| device.set_focus_mode(mode))
    }

    pub fn toggle_flash(&mut self, device: &mut dyn CameraDevice, on: bool) -> bool {
        self.toggle(device, Control::Flash, on, |device| device.set_flash(on))
    }

    pub fn toggle_zoom(&mut self, device: &mut dyn CameraDevice, on: bool) -> bool {
        let step = if on { self.zoom_step_for(self.zoom_ratio) } else { 0 };
        self.toggle(device, Control::Zoom, on, |device| device.set_zoom_step(step))
    }

    /// Run one autofocus pass targeting `area` (frame-pixel space).
    ///
    /// Returns `false` without touching the hardware when focus is not on or
    /// a previous pass is still running. Completion is reported through the
    /// listener as [`ControlEvent::FocusFinished`], and to `on_finished` when
    /// given. A rejected trigger drops `on_finished` without calling it.
    pub fn trigger_focus(
        &self,
        device: &mut dyn CameraDevice,
        area: Rect,
        on_finished: Option<FocusCallback>,
    ) -> bool {
        if !self.focus.is_on() {
            return false;
        }
        if self.focusing.swap(true, Ordering::AcqRel) {
            debug!("autofocus already in flight, coalescing");
            return false;
        }

        if let Err(e) = device.set_focus_area(area) {
            warn!("failed to set focus area: {}", e);
            self.focusing.store(false, Ordering::Release);
            return false;
        }

        let focusing = self.focusing.clone();
        let listener = self.listener.clone();
        let started = device.auto_focus(Box::new(move |success| {
            focusing.store(false, Ordering::Release);
            debug!("autofocus finished: {}", success);
            if let Some(listener) = listener {
                listener(ControlEvent::FocusFinished { success });
            }
            if let Some(on_finished) = on_finished {
                on_finished(success);
            }
        }));

        match started {
            Ok(()) => true,
            Err(e) => {
                warn!("autofocus failed to start: {}", e);
                self.focusing.store(false, Ordering::Release);
                false
            }
        }
    }

    fn toggle<F>(&mut self, device: &mut dyn CameraDevice, control: Control, on: bool, apply: F) -> bool
    where
        F: FnOnce(&mut dyn CameraDevice) -> Result<(), CaptureError>,
    {
        let current = self.state(control);
        let applied = if !current.is_supported() {
            debug!("{:?} toggle ignored: unsupported", control);
            false
        } else if current.is_on() == on {
            true
        } else {
            match apply(device) {
                Ok(()) => {
                    let next = if on { Capability::On } else { Capability::Off };
                    self.set_state(control, next);
                    self.emit(ControlEvent::CapabilityChanged { control, state: next });
                    true
                }
                Err(e) => {
                    warn!("failed to switch {:?} {}: {}", control, if on { "on" } else { "off" }, e);
                    false
                }
            }
        };

        self.emit(ControlEvent::Toggled { control, on, applied });
        applied
    }

    fn set_state(&mut self, control: Control, state: Capability) {
        match control {
            Control::Focus => self.focus = state,
            Control::Flash => self.flash = state,
            Control::Zoom => self.zoom = state,
        }
    }

    /// Index of the supported zoom ratio closest to `ratio`
    fn zoom_step_for(&self, ratio: u32) -> u32 {
        self.zoom_ratios
            .iter()
            .enumerate()
            .min_by_key(|(_, supported)| supported.abs_diff(ratio))
            .map(|(step, _)| step as u32)
            .unwrap_or(0)
    }

    fn emit(&self, event: ControlEvent) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }
}
