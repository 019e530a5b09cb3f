//! Configuration management
//!
//! TOML file with one section per concern. Every field has a default, so an
//! empty file (or no file at all) gives a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use wordlens_capture::pool::DEFAULT_BUFFER_COUNT;
use wordlens_capture::{Facing, DEFAULT_ZOOM_RATIO};
use wordlens_ocr::{CursorLayout, CURSOR_SIZE, RECOGNITION_HEIGHT_RATIO, RECOGNITION_WIDTH_RATIO};

/// Installed dictionary file name inside the data directory
pub const DICTIONARY_FILE: &str = "dictionary.db";

/// Bundled dictionary file name shipped next to the executable
pub const BUNDLED_DICTIONARY_FILE: &str = "ejdict.sqlite3";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub cursor: CursorConfig,

    #[serde(default)]
    pub dictionary: DictionaryConfig,
}

/// Camera and frame pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_facing")]
    pub facing: Facing,

    /// Requested preview width; the closest supported size is used
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Requested preview frame rate
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Number of reusable frame buffers
    #[serde(default = "default_buffer_count")]
    pub buffer_count: usize,

    /// Side of the initial centered focus area, in frame pixels
    #[serde(default = "default_focus_area_size")]
    pub focus_area_size: i32,

    /// Zoom applied by "zoom on", in percent
    #[serde(default = "default_zoom_ratio")]
    pub zoom_ratio: u32,
}

/// Overlay cursor and recognition area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorConfig {
    #[serde(default = "default_cursor_size")]
    pub size: f32,

    #[serde(default = "default_recognition_width_ratio")]
    pub recognition_width_ratio: f32,

    #[serde(default = "default_recognition_height_ratio")]
    pub recognition_height_ratio: f32,

    /// Blank everything outside the recognition area before detection
    #[serde(default = "default_true")]
    pub mask_outside_area: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Installed dictionary (defaults to the data directory)
    pub path: Option<PathBuf>,

    /// Bundled dictionary copied on first run
    pub bundled: Option<PathBuf>,
}

// Default value functions
fn default_facing() -> Facing { Facing::Back }
fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_fps() -> f32 { 20.0 }
fn default_buffer_count() -> usize { DEFAULT_BUFFER_COUNT }
fn default_focus_area_size() -> i32 { 100 }
fn default_zoom_ratio() -> u32 { DEFAULT_ZOOM_RATIO }
fn default_cursor_size() -> f32 { CURSOR_SIZE }
fn default_recognition_width_ratio() -> f32 { RECOGNITION_WIDTH_RATIO }
fn default_recognition_height_ratio() -> f32 { RECOGNITION_HEIGHT_RATIO }
fn default_true() -> bool { true }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            facing: default_facing(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            buffer_count: default_buffer_count(),
            focus_area_size: default_focus_area_size(),
            zoom_ratio: default_zoom_ratio(),
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            size: default_cursor_size(),
            recognition_width_ratio: default_recognition_width_ratio(),
            recognition_height_ratio: default_recognition_height_ratio(),
            mask_outside_area: true,
        }
    }
}

impl CursorConfig {
    pub fn layout(&self) -> CursorLayout {
        CursorLayout {
            cursor_size: self.size,
            recognition_width_ratio: self.recognition_width_ratio,
            recognition_height_ratio: self.recognition_height_ratio,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        toml::from_str(&content).context("failed to parse config TOML")
    }

    /// Load `path` if given, otherwise the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Data directory, e.g. %LOCALAPPDATA%\WordLens on Windows
    pub fn resolve_data_dir(&self) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("WordLens")
    }

    /// Where the installed dictionary lives
    pub fn resolve_dictionary_path(&self) -> PathBuf {
        self.dictionary
            .path
            .clone()
            .unwrap_or_else(|| self.resolve_data_dir().join(DICTIONARY_FILE))
    }

    /// Bundled dictionary to install from, if one is configured or ships with the binary
    pub fn resolve_bundled_path(&self) -> Option<PathBuf> {
        if let Some(ref bundled) = self.dictionary.bundled {
            return Some(bundled.clone());
        }

        let exe = std::env::current_exe().ok()?;
        let candidate = exe.parent()?.join(BUNDLED_DICTIONARY_FILE);
        candidate.exists().then_some(candidate)
    }
}
