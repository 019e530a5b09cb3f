//! Processing worker: drains the frame mailbox into the recognizer

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};

use wordlens_capture::{Frame, FrameMailbox};
use wordlens_ocr::{CursorSelector, Processor};

use crate::events::{EventSender, ScanEvent};

/// Everything a detection task needs
#[derive(Clone)]
pub struct WorkerContext {
    pub mailbox: Arc<FrameMailbox>,
    pub processor: Arc<Processor>,
    pub cursor: Arc<RwLock<CursorSelector>>,
    pub events: EventSender,
    pub runtime: Handle,
}

#[derive(Debug, Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    recognized: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn recognized(&self) -> u64 {
        self.recognized.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Single consumer of the frame mailbox.
///
/// The loop thread only waits and dispatches. Detection runs as a task on
/// the tokio runtime, and that task releases the in-flight slot when it is
/// done, which wakes the loop for the next (newest) frame.
pub struct Worker {
    mailbox: Arc<FrameMailbox>,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(context: WorkerContext) -> std::io::Result<Self> {
        let mailbox = context.mailbox.clone();
        let stats = Arc::new(WorkerStats::default());
        let loop_stats = stats.clone();

        let handle = thread::Builder::new()
            .name("wordlens-worker".into())
            .spawn(move || run_loop(context, loop_stats))?;

        Ok(Self {
            mailbox,
            stats,
            handle: Some(handle),
        })
    }

    pub fn stats(&self) -> &Arc<WorkerStats> {
        &self.stats
    }

    /// Request shutdown and wait for the loop thread to exit.
    ///
    /// A detection already in flight finishes on the runtime; its result is discarded.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.mailbox.shutdown();
        if handle.join().is_err() {
            error!("processing worker panicked");
        }
        info!(
            "processing worker stopped ({} frames processed, {} dropped)",
            self.stats.processed(),
            self.mailbox.dropped_count()
        );
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(context: WorkerContext, stats: Arc<WorkerStats>) {
    debug!("processing worker started");

    while let Some(frame) = context.mailbox.wait_for_work() {
        let task_context = context.clone();
        let task_stats = stats.clone();
        context
            .runtime
            .spawn(async move { process_frame(task_context, task_stats, frame).await });
    }

    debug!("processing worker observed shutdown");
}

/// Frame owned by a detection task.
///
/// Dropping it reports the outcome, recycles the buffer and frees the
/// in-flight slot. This also runs when detection panics or the task is
/// cancelled, in which case the cycle counts as failed.
struct InFlightFrame {
    frame: Option<Frame>,
    event: ScanEvent,
    completed: bool,
    mailbox: Arc<FrameMailbox>,
    events: EventSender,
    stats: Arc<WorkerStats>,
}

impl InFlightFrame {
    fn new(frame: Frame, context: &WorkerContext, stats: Arc<WorkerStats>) -> Self {
        Self {
            frame: Some(frame),
            event: ScanEvent::NoDetection,
            completed: false,
            mailbox: context.mailbox.clone(),
            events: context.events.clone(),
            stats,
        }
    }

    fn complete(&mut self, event: ScanEvent) {
        self.event = event;
        self.completed = true;
    }
}

impl Drop for InFlightFrame {
    fn drop(&mut self) {
        if !self.completed {
            error!("detection aborted before completion");
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.processed.fetch_add(1, Ordering::Relaxed);

        let event = std::mem::replace(&mut self.event, ScanEvent::NoDetection);
        if !self.mailbox.is_shutdown() && self.events.send(event).is_err() {
            warn!("scan event receiver dropped");
        }

        if let Some(frame) = self.frame.take() {
            if let Err(e) = self.mailbox.pool().recycle(frame) {
                warn!("failed to recycle processed frame: {}", e);
            }
        }
        self.mailbox.finish_processing();
    }
}

async fn process_frame(context: WorkerContext, stats: Arc<WorkerStats>, frame: Frame) {
    let mut in_flight = InFlightFrame::new(frame, &context, stats.clone());
    let area = context.cursor.read().recognition_frame_rect();

    let Some(frame) = in_flight.frame.as_mut() else {
        return;
    };
    let age = Utc::now() - frame.timestamp();
    trace!("frame {} waited {} ms for detection", frame.id(), age.num_milliseconds());

    let event = match context.processor.process_frame(frame, area).await {
        Ok(text) => {
            let cursor = context.cursor.read();
            match cursor.hit_test(text.elements()) {
                Some(element) => {
                    stats.recognized.fetch_add(1, Ordering::Relaxed);
                    ScanEvent::Recognized(element.text.clone())
                }
                None => ScanEvent::NoDetection,
            }
        }
        Err(_) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            ScanEvent::NoDetection
        }
    };

    in_flight.complete(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use crate::events::EventReceiver;
    use wordlens_capture::{BufferPool, FrameSize, PixelFormat, Rect};
    use wordlens_ocr::{CursorLayout, FrameImage, OcrError, RecognizedText, Recognizer, TextElement};

    /// Records the first luma byte of every frame it sees
    struct MarkerRecognizer {
        seen: Mutex<Vec<u8>>,
        latency: Duration,
        fail: bool,
    }

    impl MarkerRecognizer {
        fn new(latency: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                latency,
                fail,
            })
        }
    }

    #[async_trait]
    impl Recognizer for MarkerRecognizer {
        async fn detect(&self, image: &FrameImage<'_>) -> wordlens_ocr::Result<RecognizedText> {
            self.seen.lock().push(image.data[0]);
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(OcrError::Detection("no engine".into()));
            }
            Ok(RecognizedText::from_elements(vec![TextElement::new(
                Rect::new(0, 0, 480, 640),
                format!("frame-{}", image.data[0]),
            )]))
        }
    }

    /// Panics on its first call, then recognizes every frame
    struct PanicOnceRecognizer {
        panicked: AtomicBool,
    }

    #[async_trait]
    impl Recognizer for PanicOnceRecognizer {
        async fn detect(&self, image: &FrameImage<'_>) -> wordlens_ocr::Result<RecognizedText> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("recognizer crashed on frame {}", image.data[0]);
            }
            Ok(RecognizedText::from_elements(vec![TextElement::new(
                Rect::new(0, 0, 480, 640),
                format!("frame-{}", image.data[0]),
            )]))
        }
    }

    struct Harness {
        pool: Arc<BufferPool>,
        mailbox: Arc<FrameMailbox>,
        context: WorkerContext,
        events: EventReceiver,
    }

    fn harness(recognizer: Arc<dyn Recognizer>) -> Harness {
        let pool = Arc::new(BufferPool::new(FrameSize::new(64, 48), PixelFormat::Nv21, 4).unwrap());
        pool.prime().unwrap();
        let mailbox = Arc::new(FrameMailbox::new(pool.clone()));

        let mut cursor = CursorSelector::for_view(480.0, 640.0, &CursorLayout::default());
        cursor.set_recognition_area(None);
        cursor.set_scale(480, 640, 480, 640);

        let (tx, rx) = crate::events::channel();
        let context = WorkerContext {
            mailbox: mailbox.clone(),
            processor: Arc::new(Processor::new(recognizer)),
            cursor: Arc::new(RwLock::new(cursor)),
            events: tx,
            runtime: Handle::current(),
        };

        Harness {
            pool,
            mailbox,
            context,
            events: rx,
        }
    }

    async fn next_event(events: &mut EventReceiver) -> ScanEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a scan event")
            .expect("event channel closed")
    }

    /// Wait for the detection task to release its frame
    async fn wait_idle(mailbox: &FrameMailbox) {
        for _ in 0..500 {
            if !mailbox.in_flight() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("detection task never finished");
    }

    fn marked_frame(pool: &BufferPool, marker: u8) -> Frame {
        let mut frame = pool.acquire().unwrap();
        frame.data_mut()[0] = marker;
        frame
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_only_newest_frame_is_processed() {
        let recognizer = MarkerRecognizer::new(Duration::ZERO, false);
        let mut h = harness(recognizer.clone());

        h.mailbox.publish(marked_frame(&h.pool, 1)).unwrap();
        h.mailbox.publish(marked_frame(&h.pool, 2)).unwrap();
        // frame 1 went back to the pool without reaching the recognizer
        assert_eq!(h.pool.available(), 3);

        let mut worker = Worker::spawn(h.context.clone()).unwrap();
        let event = next_event(&mut h.events).await;
        assert_eq!(event, ScanEvent::Recognized("frame-2".into()));

        worker.stop();
        wait_idle(&h.mailbox).await;
        assert_eq!(*recognizer.seen.lock(), vec![2]);
        assert_eq!(h.pool.available(), 4);
        assert_eq!(worker.stats().processed(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_frames_published_during_detection_are_drained() {
        let recognizer = MarkerRecognizer::new(Duration::from_millis(100), false);
        let mut h = harness(recognizer.clone());
        let mut worker = Worker::spawn(h.context.clone()).unwrap();

        h.mailbox.publish(marked_frame(&h.pool, 1)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(h.mailbox.in_flight());

        // 2 is superseded by 3 while 1 is being detected
        h.mailbox.publish(marked_frame(&h.pool, 2)).unwrap();
        h.mailbox.publish(marked_frame(&h.pool, 3)).unwrap();

        let first = next_event(&mut h.events).await;
        let second = next_event(&mut h.events).await;
        assert_eq!(first, ScanEvent::Recognized("frame-1".into()));
        assert_eq!(second, ScanEvent::Recognized("frame-3".into()));

        worker.stop();
        assert_eq!(*recognizer.seen.lock(), vec![1, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_reports_no_detection_and_recycles() {
        let recognizer = MarkerRecognizer::new(Duration::ZERO, true);
        let mut h = harness(recognizer);
        let mut worker = Worker::spawn(h.context.clone()).unwrap();

        h.mailbox.publish(marked_frame(&h.pool, 7)).unwrap();
        let event = next_event(&mut h.events).await;
        assert_eq!(event, ScanEvent::NoDetection);

        worker.stop();
        wait_idle(&h.mailbox).await;
        assert_eq!(worker.stats().failed(), 1);
        assert_eq!(h.pool.available(), 4);
        assert!(!h.mailbox.in_flight());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_result_after_shutdown_is_discarded() {
        let recognizer = MarkerRecognizer::new(Duration::from_millis(100), false);
        let mut h = harness(recognizer);
        let mut worker = Worker::spawn(h.context.clone()).unwrap();

        h.mailbox.publish(marked_frame(&h.pool, 1)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        worker.stop();

        // the in-flight detection completes but reports nothing
        wait_idle(&h.mailbox).await;
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.pool.available(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_detection_releases_frame_and_slot() {
        let mut h = harness(Arc::new(PanicOnceRecognizer {
            panicked: AtomicBool::new(false),
        }));
        let mut worker = Worker::spawn(h.context.clone()).unwrap();

        h.mailbox.publish(marked_frame(&h.pool, 1)).unwrap();
        assert_eq!(next_event(&mut h.events).await, ScanEvent::NoDetection);
        wait_idle(&h.mailbox).await;
        assert_eq!(h.pool.available(), 4);

        // the pipeline keeps going after the crash
        h.mailbox.publish(marked_frame(&h.pool, 2)).unwrap();
        assert_eq!(next_event(&mut h.events).await, ScanEvent::Recognized("frame-2".into()));

        worker.stop();
        wait_idle(&h.mailbox).await;
        assert_eq!(worker.stats().processed(), 2);
        assert_eq!(worker.stats().recognized(), 1);
        assert_eq!(worker.stats().failed(), 1);
        assert_eq!(h.pool.available(), 4);
        assert!(!h.mailbox.in_flight());
    }
}
