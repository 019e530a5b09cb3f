//! Fixed set of reusable frame buffers shared with the capture hardware

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, error, trace};

use crate::error::CaptureError;
use crate::frame::{BufferId, Frame, FrameSize, PixelFormat};

/// Default number of buffers; enough to keep capture and recognition pipelined
pub const DEFAULT_BUFFER_COUNT: usize = 4;

/// Buffer ids are process-wide so a frame recycled into the wrong pool is caught
static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

struct PoolState {
    /// Buffers queued for the hardware to fill
    available: VecDeque<Frame>,
    /// Every id this pool has ever handed out
    registered: HashSet<BufferId>,
    /// Ids currently owned by the hardware, the mailbox or the worker
    in_use: HashSet<BufferId>,
}

/// Buffer pool for one capture configuration.
///
/// Both the hardware callback thread and the processing side recycle into
/// the pool, so all bookkeeping sits behind a single lock.
pub struct BufferPool {
    size: FrameSize,
    format: PixelFormat,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(size: FrameSize, format: PixelFormat, capacity: usize) -> Result<Self, CaptureError> {
        if size.width == 0 || size.height == 0 {
            return Err(CaptureError::InvalidSize(size.width, size.height));
        }
        let capacity = capacity.max(1);
        debug!(
            "creating buffer pool: {} buffers of {} bytes ({})",
            capacity,
            size.buffer_len(format),
            size
        );

        Ok(Self {
            size,
            format,
            capacity,
            state: Mutex::new(PoolState {
                available: VecDeque::with_capacity(capacity),
                registered: HashSet::with_capacity(capacity),
                in_use: HashSet::with_capacity(capacity),
            }),
        })
    }

    /// Construct and register a new buffer. The caller owns it until it is recycled.
    pub fn allocate(&self) -> Result<Frame, CaptureError> {
        let mut state = self.state.lock();
        if state.registered.len() >= self.capacity {
            return Err(CaptureError::PoolExhausted(state.registered.len()));
        }

        let id = BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed));
        state.registered.insert(id);
        state.in_use.insert(id);
        trace!("allocated buffer {}", id);

        Ok(Frame::new(id, self.size, self.format))
    }

    /// Register every remaining buffer and queue it for the hardware
    pub fn prime(&self) -> Result<(), CaptureError> {
        while self.registered() < self.capacity {
            let frame = self.allocate()?;
            self.recycle(frame)?;
        }
        Ok(())
    }

    /// Next buffer for the hardware to fill, if any is free
    pub fn acquire(&self) -> Option<Frame> {
        let mut state = self.state.lock();
        let frame = state.available.pop_front()?;
        state.in_use.insert(frame.id());
        Some(frame)
    }

    /// Return a buffer to the hardware availability queue.
    ///
    /// Safe to call from the capture callback and the processing side alike.
    /// Recycling a buffer this pool does not know, or one that is already
    /// queued, means ownership went wrong somewhere and is reported as an error.
    pub fn recycle(&self, frame: Frame) -> Result<(), CaptureError> {
        let id = frame.id();
        let mut state = self.state.lock();

        if !state.registered.contains(&id) {
            error!("recycle of unknown buffer {} - dropping it", id);
            return Err(CaptureError::UnknownBuffer(id));
        }
        if !state.in_use.remove(&id) {
            error!("buffer {} recycled twice", id);
            return Err(CaptureError::BufferNotInUse(id));
        }

        state.available.push_back(frame);
        trace!("recycled buffer {} ({} available)", id, state.available.len());
        Ok(())
    }

    pub fn frame_size(&self) -> FrameSize {
        self.size
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers registered so far
    pub fn registered(&self) -> usize {
        self.state.lock().registered.len()
    }

    /// Number of buffers waiting for the hardware
    pub fn available(&self) -> usize {
        self.state.lock().available.len()
    }

    /// Number of buffers owned outside the pool
    pub fn in_use(&self) -> usize {
        self.state.lock().in_use.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> BufferPool {
        BufferPool::new(FrameSize::new(8, 4), PixelFormat::Nv21, capacity).unwrap()
    }

    #[test]
    fn test_allocate_up_to_capacity() {
        let pool = pool(2);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.data().len(), FrameSize::new(8, 4).buffer_len(PixelFormat::Nv21));
        assert!(matches!(pool.allocate(), Err(CaptureError::PoolExhausted(2))));
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_prime_and_acquire_cycle() {
        let pool = pool(DEFAULT_BUFFER_COUNT);
        pool.prime().unwrap();
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.in_use(), 0);

        let frame = pool.acquire().unwrap();
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.in_use(), 1);

        pool.recycle(frame).unwrap();
        assert_eq!(pool.available(), 4);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_acquire_empty_pool() {
        let pool = pool(1);
        pool.prime().unwrap();
        let _held = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_recycle_unknown_buffer_is_reported() {
        let first = pool(1);
        let second = pool(1);
        let foreign = second.allocate().unwrap();

        let err = first.recycle(foreign).unwrap_err();
        assert!(matches!(err, CaptureError::UnknownBuffer(_)));
        assert_eq!(first.available(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let pool = pool(0);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_invalid_size() {
        assert!(BufferPool::new(FrameSize::new(0, 480), PixelFormat::Nv21, 4).is_err());
    }

    #[test]
    fn test_concurrent_acquire_never_hands_out_a_buffer_twice() {
        use parking_lot::Mutex;
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(pool(DEFAULT_BUFFER_COUNT));
        pool.prime().unwrap();
        let held = Arc::new(Mutex::new(HashSet::new()));

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let (pool, held) = (pool.clone(), held.clone());
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        let Some(frame) = pool.acquire() else {
                            thread::yield_now();
                            continue;
                        };
                        assert!(held.lock().insert(frame.id()), "buffer {} handed out twice", frame.id());
                        thread::yield_now();
                        held.lock().remove(&frame.id());
                        pool.recycle(frame).unwrap();
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert!(held.lock().is_empty());
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.available(), DEFAULT_BUFFER_COUNT);
    }
}
