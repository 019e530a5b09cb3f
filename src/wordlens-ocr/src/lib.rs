//! Text recognition boundary for WordLens
//!
//! Defines the recognizer interface frames are handed to, the frame
//! processor that blanks everything outside the recognition area, and the
//! cursor selector that picks the detected word under the on-screen cursor.

mod cursor;
mod engine;
mod error;
mod processor;
mod scripted;

pub use cursor::{CursorLayout, CursorSelector, CURSOR_SIZE, RECOGNITION_HEIGHT_RATIO, RECOGNITION_WIDTH_RATIO};
pub use engine::{FrameImage, RecognizedText, Recognizer, TextBlock, TextElement, TextLine};
pub use error::{OcrError, Result};
pub use processor::{mask_outside, upright_to_buffer, Processor};
pub use scripted::{ScriptStep, ScriptedRecognizer};
