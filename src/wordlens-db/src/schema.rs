//! Dictionary record types

use serde::{Deserialize, Serialize};

/// Headword plus its combined definition text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Canonical spelling as stored
    pub word: String,
    /// Definitions of every matching row, each followed by a blank line
    pub mean: String,
}

impl DictionaryEntry {
    /// Individual definition lines, skipping blanks
    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.mean.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

/// Row to insert into `items`
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub word: String,
    pub mean: String,
}

impl NewEntry {
    pub fn new(word: impl Into<String>, mean: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            mean: mean.into(),
        }
    }
}

/// Word inside a definition that is itself a dictionary headword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    /// Byte offsets into `DictionaryEntry::mean`
    pub start: usize,
    pub end: usize,
    pub text: String,
}
