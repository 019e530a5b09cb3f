//! Replay camera that streams still images as NV21 preview frames
//!
//! Stands in for real capture hardware on desktops and in tests: it behaves
//! like a fixed-focus camera without torch or zoom, and feeds frames from its
//! own thread the way a driver callback would.

use image::{imageops::FilterType, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::device::{
    CameraDevice, CameraOpener, CaptureSettings, DeviceCapabilities, Facing, FocusCallback,
    FocusMode, FpsRange, FrameSink,
};
use crate::error::CaptureError;
use crate::frame::{FrameSize, PixelFormat};
use crate::geometry::Rect;
use crate::pool::BufferPool;

/// Frame rate offered by the replay camera
const REPLAY_FPS: u32 = 10;

/// Convert an RGB image to NV21 (BT.601, full range luma plane + interleaved VU).
/// Width and height must be even.
pub fn rgb_to_nv21(image: &RgbImage) -> Vec<u8> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut out = vec![0u8; width * height * 3 / 2];
    let (luma, chroma) = out.split_at_mut(width * height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0.map(|c| c as f32);
        let (x, y) = (x as usize, y as usize);

        luma[y * width + x] = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;

        if x % 2 == 0 && y % 2 == 0 {
            let u = -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
            let v = 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
            let offset = (y / 2) * width + x;
            chroma[offset] = v.round().clamp(0.0, 255.0) as u8;
            chroma[offset + 1] = u.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Camera backed by a list of still images
pub struct ReplayCamera {
    images: Vec<RgbImage>,
    native_size: FrameSize,
    settings: Option<CaptureSettings>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReplayCamera {
    /// Load every image in `paths`; they are scaled to the first image's size
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, CaptureError> {
        let images = paths
            .iter()
            .map(|path| {
                debug!("loading replay frame {:?}", path);
                Ok(image::open(path)?.to_rgb8())
            })
            .collect::<Result<Vec<_>, CaptureError>>()?;
        Self::from_images(images)
    }

    /// Load every png/jpg file in `dir`, sorted by name
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        info!("replaying {} frames from {:?}", paths.len(), dir.as_ref());
        Self::from_paths(&paths)
    }

    pub fn from_images(images: Vec<RgbImage>) -> Result<Self, CaptureError> {
        let first = images.first().ok_or(CaptureError::NoSuitableSize)?;
        // NV21 chroma subsampling needs even dimensions
        let native_size = FrameSize::new(first.width() & !1, first.height() & !1);
        if native_size.width == 0 || native_size.height == 0 {
            return Err(CaptureError::InvalidSize(first.width(), first.height()));
        }

        Ok(Self {
            images,
            native_size,
            settings: None,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    fn encode_frames(&self, size: FrameSize) -> Vec<Vec<u8>> {
        self.images
            .iter()
            .map(|image| {
                if image.width() == size.width && image.height() == size.height {
                    rgb_to_nv21(image)
                } else {
                    let scaled = image::imageops::resize(image, size.width, size.height, FilterType::Triangle);
                    rgb_to_nv21(&scaled)
                }
            })
            .collect()
    }
}

impl CameraDevice for ReplayCamera {
    fn supported_sizes(&self) -> Vec<FrameSize> {
        vec![self.native_size]
    }

    fn supported_fps_ranges(&self) -> Vec<FpsRange> {
        vec![FpsRange::fixed(REPLAY_FPS)]
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_focus_areas: 0,
            supports_macro_focus: false,
            supports_torch: false,
            zoom_ratios: vec![100],
        }
    }

    fn configure(&mut self, settings: &CaptureSettings) -> Result<(), CaptureError> {
        if settings.format != PixelFormat::Nv21 {
            return Err(CaptureError::Unsupported("pixel format"));
        }
        if settings.size.width % 2 != 0 || settings.size.height % 2 != 0 {
            return Err(CaptureError::InvalidSize(settings.size.width, settings.size.height));
        }
        self.settings = Some(*settings);
        Ok(())
    }

    fn start(&mut self, pool: Arc<BufferPool>, sink: Arc<dyn FrameSink>) -> Result<(), CaptureError> {
        let settings = self.settings.ok_or(CaptureError::NotInitialized)?;
        if self.thread.is_some() {
            return Ok(());
        }

        let frames = self.encode_frames(settings.size);
        let interval = Duration::from_secs_f64(1000.0 / settings.fps_range.max.max(1) as f64);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        self.thread = Some(
            thread::Builder::new()
                .name("wordlens-replay".into())
                .spawn(move || {
                    let mut index = 0usize;
                    while running.load(Ordering::SeqCst) {
                        thread::sleep(interval);
                        let Some(mut frame) = pool.acquire() else {
                            trace!("no free buffer, skipping replay frame");
                            continue;
                        };

                        let source = &frames[index % frames.len()];
                        let len = source.len().min(frame.data().len());
                        frame.data_mut()[..len].copy_from_slice(&source[..len]);
                        frame.stamp();
                        sink.on_frame_available(frame);
                        index += 1;
                    }
                    debug!("replay thread stopped after {} frames", index);
                })?,
        );

        info!("replay camera started at {} ({} images)", settings.size, self.images.len());
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("replay thread panicked");
            }
        }
    }

    fn set_flash(&mut self, _on: bool) -> Result<(), CaptureError> {
        Err(CaptureError::Unsupported("flash"))
    }

    fn set_zoom_step(&mut self, step: u32) -> Result<(), CaptureError> {
        if step == 0 {
            Ok(())
        } else {
            Err(CaptureError::Unsupported("zoom"))
        }
    }

    fn set_focus_mode(&mut self, mode: FocusMode) -> Result<(), CaptureError> {
        match mode {
            FocusMode::Fixed => Ok(()),
            FocusMode::Macro => Err(CaptureError::Unsupported("macro focus")),
        }
    }

    fn set_focus_area(&mut self, _area: Rect) -> Result<(), CaptureError> {
        Err(CaptureError::Unsupported("focus areas"))
    }

    fn auto_focus(&mut self, _callback: FocusCallback) -> Result<(), CaptureError> {
        Err(CaptureError::Unsupported("autofocus"))
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens a [`ReplayCamera`] over a fixed image set, as the back camera only
pub struct ReplayOpener {
    source: PathBuf,
}

impl ReplayOpener {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self { source: source.into() }
    }
}

impl CameraOpener for ReplayOpener {
    fn open(&self, facing: Facing) -> Result<Box<dyn CameraDevice>, CaptureError> {
        if facing != Facing::Back {
            return Err(CaptureError::NoCamera(facing));
        }
        let camera = if self.source.is_dir() {
            ReplayCamera::from_dir(&self.source)?
        } else {
            ReplayCamera::from_paths(std::slice::from_ref(&self.source))?
        };
        Ok(Box::new(camera))
    }
}
