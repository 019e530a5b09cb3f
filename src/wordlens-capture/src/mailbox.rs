//! Single-slot, newest-wins handoff between the capture callback and the worker

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::CaptureError;
use crate::frame::Frame;
use crate::pool::BufferPool;

struct Slot {
    pending: Option<Frame>,
    in_flight: bool,
    shutdown: bool,
}

/// Frame mailbox.
///
/// `publish` never blocks the producer: a frame that is still waiting when a
/// newer one arrives is recycled straight back to the pool. The in-flight flag
/// keeps at most one frame at the recognizer; frames published meanwhile wait
/// in the slot until the worker calls [`FrameMailbox::finish_processing`].
///
/// The slot lock and the pool lock are never held together. Superseded
/// frames are recycled only after the slot lock is released.
pub struct FrameMailbox {
    pool: Arc<BufferPool>,
    slot: Mutex<Slot>,
    ready: Condvar,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FrameMailbox {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            slot: Mutex::new(Slot {
                pending: None,
                in_flight: false,
                shutdown: false,
            }),
            ready: Condvar::new(),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Pool the mailbox recycles superseded frames into
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Hand over a freshly captured frame. Safe to call from any thread.
    pub fn publish(&self, frame: Frame) -> Result<(), CaptureError> {
        self.published.fetch_add(1, Ordering::Relaxed);

        let stale = {
            let mut slot = self.slot.lock();
            if slot.shutdown {
                Some(frame)
            } else {
                let previous = slot.pending.replace(frame);
                self.ready.notify_all();
                previous
            }
        };

        if let Some(stale) = stale {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("dropping frame {} without processing", stale.id());
            self.pool.recycle(stale)?;
        }
        Ok(())
    }

    /// Take the pending frame if the worker is idle, marking it in flight
    pub fn take_for_processing(&self) -> Option<Frame> {
        let mut slot = self.slot.lock();
        if slot.shutdown || slot.in_flight {
            return None;
        }
        let frame = slot.pending.take()?;
        slot.in_flight = true;
        Some(frame)
    }

    /// Block until a frame can be taken or shutdown is requested.
    ///
    /// Returns `None` only on shutdown.
    pub fn wait_for_work(&self) -> Option<Frame> {
        let mut slot = self.slot.lock();
        loop {
            if slot.shutdown {
                return None;
            }
            if !slot.in_flight {
                if let Some(frame) = slot.pending.take() {
                    slot.in_flight = true;
                    return Some(frame);
                }
            }
            self.ready.wait(&mut slot);
        }
    }

    /// Clear the in-flight flag after the recognizer is done with a frame
    pub fn finish_processing(&self) {
        let mut slot = self.slot.lock();
        slot.in_flight = false;
        self.ready.notify_all();
    }

    /// Stop handing out frames and wake every waiter
    pub fn shutdown(&self) {
        let pending = {
            let mut slot = self.slot.lock();
            slot.shutdown = true;
            self.ready.notify_all();
            slot.pending.take()
        };
        debug!("frame mailbox shut down");

        if let Some(frame) = pending {
            if let Err(e) = self.pool.recycle(frame) {
                warn!("failed to recycle pending frame on shutdown: {}", e);
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.slot.lock().shutdown
    }

    pub fn has_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.slot.lock().in_flight
    }

    /// Frames published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames recycled without ever reaching the recognizer
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
