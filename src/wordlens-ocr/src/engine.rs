use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wordlens_capture::{Frame, Rect, Rotation};

/// Recognized word with its bounding box in upright frame-pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub bounds: Rect,
    pub text: String,
}

impl TextElement {
    pub fn new(bounds: Rect, text: impl Into<String>) -> Self {
        Self {
            bounds,
            text: text.into(),
        }
    }
}

/// Line of text containing one or more elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    #[serde(default)]
    pub text: String,
    pub elements: Vec<TextElement>,
}

/// Paragraph-level group of lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

/// Complete detection result for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub blocks: Vec<TextBlock>,
}

impl RecognizedText {
    /// Single block with a single line holding `elements`
    pub fn from_elements(elements: Vec<TextElement>) -> Self {
        let text = elements
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            blocks: vec![TextBlock {
                lines: vec![TextLine { text, elements }],
            }],
        }
    }

    /// All elements in block, then line, then element order
    pub fn elements(&self) -> impl Iterator<Item = &TextElement> {
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter())
            .flat_map(|line| line.elements.iter())
    }

    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }
}

/// Borrowed view of the pixels handed to a recognizer
#[derive(Debug, Clone, Copy)]
pub struct FrameImage<'a> {
    /// NV21 bytes, luma plane first
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Rotation needed to display the frame upright
    pub rotation: Rotation,
}

impl<'a> FrameImage<'a> {
    pub fn from_frame(frame: &'a Frame) -> Self {
        Self {
            data: frame.data(),
            width: frame.width(),
            height: frame.height(),
            rotation: frame.rotation(),
        }
    }

    /// Width and height once the rotation is applied
    pub fn upright_size(&self) -> (u32, u32) {
        if self.rotation.is_transposed() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// External text recognition capability.
///
/// Returned boxes are in upright frame-pixel coordinates. Callers never have
/// more than one `detect` outstanding.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn detect(&self, image: &FrameImage<'_>) -> Result<RecognizedText>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "recognizer"
    }
}
