//! Recognizer that replays canned detections from JSON
//!
//! Used by the replay command and by pipeline tests in place of a real OCR
//! engine. Each `detect` call returns the next step of the script, wrapping
//! around at the end.

use crate::engine::{FrameImage, RecognizedText, Recognizer};
use crate::error::{OcrError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// One scripted detection outcome
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Detected(RecognizedText),
    Failed { error: String },
}

pub struct ScriptedRecognizer {
    steps: Vec<ScriptStep>,
    next: AtomicUsize,
    latency: Duration,
}

impl ScriptedRecognizer {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            next: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Every call returns the same detections
    pub fn repeating(text: RecognizedText) -> Self {
        Self::new(vec![ScriptStep::Detected(text)])
    }

    /// Parse a JSON array of steps
    pub fn from_json(json: &str) -> Result<Self> {
        let steps: Vec<ScriptStep> = serde_json::from_str(json)?;
        Ok(Self::new(steps))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let recognizer = Self::from_json(&json)?;
        info!("loaded {} scripted detections from {:?}", recognizer.steps.len(), path);
        Ok(recognizer)
    }

    /// Simulated detection time per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `detect` calls so far
    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn detect(&self, image: &FrameImage<'_>) -> Result<RecognizedText> {
        let call = self.next.fetch_add(1, Ordering::SeqCst);
        debug!("scripted detection #{} on {}x{} frame", call, image.width, image.height);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.steps.is_empty() {
            return Ok(RecognizedText::default());
        }

        match &self.steps[call % self.steps.len()] {
            ScriptStep::Detected(text) => Ok(text.clone()),
            ScriptStep::Failed { error } => Err(OcrError::Detection(error.clone())),
        }
    }

    fn name(&self) -> &str {
        "scripted recognizer"
    }
}
