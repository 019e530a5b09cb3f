//! Outbound notifications from a running scanner

use tokio::sync::mpsc;
use wordlens_capture::ControlEvent;

/// One notification per processed frame, plus control-state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Text of the element under the cursor
    Recognized(String),
    /// Nothing under the cursor this cycle, or detection failed
    NoDetection,
    /// Focus, flash or zoom state change
    Control(ControlEvent),
}

/// Sending never blocks, so it is safe from hardware callbacks and runtime tasks alike
pub type EventSender = mpsc::UnboundedSender<ScanEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

/// Create the channel a scanner reports into
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
