use crate::engine::{FrameImage, RecognizedText, Recognizer};
use crate::error::{OcrError, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use wordlens_capture::{Frame, FrameSize, Rect, Rotation};

/// Prepares captured frames and runs them through a [`Recognizer`]
pub struct Processor {
    recognizer: Arc<dyn Recognizer>,
}

impl Processor {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    pub fn recognizer(&self) -> &Arc<dyn Recognizer> {
        &self.recognizer
    }

    /// Detect text in `frame`.
    ///
    /// `area` is the recognition area in upright frame space; everything
    /// outside it is blanked before detection.
    pub async fn process_frame(&self, frame: &mut Frame, area: Option<Rect>) -> Result<RecognizedText> {
        let size = frame.size();
        let expected = nv21_len(size);
        if frame.data().len() < expected {
            return Err(OcrError::Conversion(format!(
                "invalid frame data size: expected at least {}, got {}",
                expected,
                frame.data().len()
            )));
        }

        if let Some(area) = area {
            let buffer_area = upright_to_buffer(area, frame.rotation(), size);
            mask_outside(frame.data_mut(), size, buffer_area);
        }

        let started = Instant::now();
        let image = FrameImage::from_frame(frame);
        let result = self.recognizer.detect(&image).await;

        match &result {
            Ok(text) => debug!(
                "{} found {} elements in frame {} ({:?})",
                self.recognizer.name(),
                text.element_count(),
                frame.id(),
                started.elapsed()
            ),
            Err(e) => warn!("{} failed on frame {}: {}", self.recognizer.name(), frame.id(), e),
        }

        result
    }
}

fn nv21_len(size: FrameSize) -> usize {
    size.pixel_count() * 3 / 2
}

/// Map an upright-space rectangle back onto the unrotated sensor buffer
pub fn upright_to_buffer(rect: Rect, rotation: Rotation, buffer: FrameSize) -> Rect {
    let w = buffer.width as i32;
    let h = buffer.height as i32;

    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => Rect::new(rect.top, h - rect.right, rect.bottom, h - rect.left),
        Rotation::Deg180 => Rect::new(w - rect.right, h - rect.bottom, w - rect.left, h - rect.top),
        Rotation::Deg270 => Rect::new(w - rect.bottom, rect.left, w - rect.top, rect.right),
    }
}

/// Zero every NV21 byte outside `keep` (luma plane and the half-height VU plane)
pub fn mask_outside(data: &mut [u8], size: FrameSize, keep: Rect) {
    let width = size.width as usize;
    let height = size.height as usize;
    let keep = keep.clamp_to(size.width, size.height);
    let (left, top) = (keep.left as usize, keep.top as usize);
    let (right, bottom) = (keep.right as usize, keep.bottom as usize);

    let (luma, chroma) = data.split_at_mut(width * height);

    for (y, row) in luma.chunks_exact_mut(width).enumerate() {
        if y < top || y >= bottom {
            row.fill(0);
        } else {
            row[..left].fill(0);
            row[right..].fill(0);
        }
    }

    // keep whole VU pairs
    let chroma_left = left & !1;
    let chroma_right = (right + 1).min(width) & !1;
    let chroma_rows = height.div_ceil(2);
    for (y, row) in chroma.chunks_mut(width).take(chroma_rows).enumerate() {
        if y < top / 2 || y >= bottom.div_ceil(2) {
            row.fill(0);
        } else {
            let end = chroma_right.min(row.len());
            row[..chroma_left.min(end)].fill(0);
            row[end..].fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TextElement;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use wordlens_capture::{BufferPool, PixelFormat};

    struct CapturingRecognizer {
        seen: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    #[async_trait]
    impl Recognizer for CapturingRecognizer {
        async fn detect(&self, image: &FrameImage<'_>) -> Result<RecognizedText> {
            self.seen.lock().push(image.data.to_vec());
            if self.fail {
                return Err(OcrError::Detection("boom".into()));
            }
            Ok(RecognizedText::from_elements(vec![TextElement::new(
                Rect::new(0, 0, 1, 1),
                "ok",
            )]))
        }
    }

    fn frame(width: u32, height: u32) -> Frame {
        let pool = BufferPool::new(FrameSize::new(width, height), PixelFormat::Nv21, 1).unwrap();
        let mut frame = pool.allocate().unwrap();
        frame.data_mut().fill(0xff);
        frame
    }

    #[test]
    fn test_upright_to_buffer_rotations() {
        let buffer = FrameSize::new(640, 480);
        let rect = Rect::new(10, 20, 110, 60);

        assert_eq!(upright_to_buffer(rect, Rotation::Deg0, buffer), rect);
        assert_eq!(upright_to_buffer(rect, Rotation::Deg90, buffer), Rect::new(20, 370, 60, 470));
        assert_eq!(upright_to_buffer(rect, Rotation::Deg180, buffer), Rect::new(530, 420, 630, 460));
        assert_eq!(upright_to_buffer(rect, Rotation::Deg270, buffer), Rect::new(580, 10, 620, 110));
    }

    #[test]
    fn test_mask_outside_area() {
        let size = FrameSize::new(4, 4);
        let mut data = vec![0xffu8; 24];
        mask_outside(&mut data, size, Rect::new(1, 1, 3, 3));

        #[rustfmt::skip]
        let expected_luma = [
            0, 0, 0, 0,
            0, 0xff, 0xff, 0,
            0, 0xff, 0xff, 0,
            0, 0, 0, 0,
        ];
        assert_eq!(&data[..16], &expected_luma);
        // chroma rows 0..2 cover luma rows 0..4; pairs 0..4 are kept
        assert!(data[16..24].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_mask_chroma_rows() {
        let size = FrameSize::new(4, 8);
        let mut data = vec![0xffu8; 48];
        mask_outside(&mut data, size, Rect::new(0, 4, 2, 6));

        let chroma = &data[32..48];
        // chroma row 2 covers luma rows 4..6
        assert!(chroma[..8].iter().all(|&b| b == 0));
        assert_eq!(&chroma[8..12], &[0xff, 0xff, 0, 0]);
        assert!(chroma[12..].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_process_frame_masks_before_detection() {
        let recognizer = Arc::new(CapturingRecognizer {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let processor = Processor::new(recognizer.clone());
        let mut frame = frame(4, 4);

        // upright (rotated 90) 4x4 frame; keep the top-left quarter
        let text = processor
            .process_frame(&mut frame, Some(Rect::new(0, 0, 2, 2)))
            .await
            .unwrap();
        assert_eq!(text.element_count(), 1);

        let seen = recognizer.seen.lock();
        // maps to buffer rect (0, 2, 2, 4)
        assert_eq!(&seen[0][..4], &[0, 0, 0, 0]);
        assert_eq!(&seen[0][8..12], &[0xff, 0xff, 0, 0]);
    }

    #[tokio::test]
    async fn test_process_frame_without_area_keeps_pixels() {
        let recognizer = Arc::new(CapturingRecognizer {
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let processor = Processor::new(recognizer.clone());
        let mut frame = frame(4, 4);

        assert!(matches!(
            processor.process_frame(&mut frame, None).await,
            Err(OcrError::Detection(_))
        ));
        assert!(recognizer.seen.lock()[0].iter().all(|&b| b == 0xff));
    }
}
