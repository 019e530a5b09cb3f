//! Lookup session: recognized words to dictionary entries, plus link history

use tracing::debug;
use wordlens_db::{find_links, DictionaryEntry, DictionarySearch, LinkSpan};

/// Turns recognized words into dictionary entries.
///
/// The first history entry is the last recognized word; followed links are
/// stacked on top of it.
pub struct LookupSession {
    search: DictionarySearch,
    history: Vec<DictionaryEntry>,
    paused: bool,
}

impl LookupSession {
    pub fn new(search: DictionarySearch) -> Self {
        Self {
            search,
            history: Vec::new(),
            paused: false,
        }
    }

    /// Handle a word under the cursor.
    ///
    /// Returns the new entry, or `None` when paused, when nothing matched, or
    /// when it resolves to the same headword as the last recognized word.
    pub fn on_recognized(&mut self, text: &str) -> Option<&DictionaryEntry> {
        if self.paused {
            return None;
        }

        let entry = self.search.search(text)?;
        if self.history.first().is_some_and(|root| root.word == entry.word) {
            debug!("{:?} resolves to the current headword, keeping history", text);
            return None;
        }

        self.history.clear();
        self.history.push(entry);
        self.history.last()
    }

    /// Lookup of a word typed by hand; always starts a new history
    pub fn search_typed(&mut self, text: &str) -> Option<&DictionaryEntry> {
        let entry = self.search.search(text)?;
        self.history.clear();
        self.history.push(entry);
        self.history.last()
    }

    /// Open a link from the current definition
    pub fn follow_link(&mut self, word: &str) -> Option<&DictionaryEntry> {
        let entry = self.search.search_direct(word)?;
        self.history.push(entry);
        self.history.last()
    }

    /// Return to the previous entry. The root entry is never popped.
    pub fn back(&mut self) -> Option<&DictionaryEntry> {
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        self.history.last()
    }

    pub fn current(&self) -> Option<&DictionaryEntry> {
        self.history.last()
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    /// Linkable words in the current definition
    pub fn links(&self) -> Vec<LinkSpan> {
        let Some(entry) = self.current() else {
            return Vec::new();
        };

        find_links(entry, &self.search)
    }

    /// While paused, recognized words are ignored
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
