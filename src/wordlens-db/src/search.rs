use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::DatabaseError;
use crate::queries;
use crate::schema::DictionaryEntry;
use crate::stemmer;
use crate::Dictionary;

/// Strip one leading and one trailing ASCII punctuation character.
///
/// Returns `None` when nothing is left.
pub fn trim_symbols(text: &str) -> Option<String> {
    let mut trimmed = text;
    if let Some(first) = trimmed.chars().next() {
        if first.is_ascii_punctuation() {
            trimmed = &trimmed[1..];
        }
    }
    if let Some(last) = trimmed.chars().next_back() {
        if last.is_ascii_punctuation() {
            trimmed = &trimmed[..trimmed.len() - 1];
        }
    }

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Word lookup with fallbacks for abbreviations and inflected forms
#[derive(Clone)]
pub struct DictionarySearch {
    dictionary: Arc<Dictionary>,
}

impl DictionarySearch {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// Best-effort lookup of a recognized word.
    ///
    /// Tries the word itself, then the word with a trailing abbreviation
    /// removed, then the base form implied by its suffix.
    pub fn search(&self, word: &str) -> Option<DictionaryEntry> {
        let word = trim_symbols(&word.to_lowercase())?;

        self.search_direct(&word)
            .or_else(|| self.search_without_abbreviation(&word))
            .or_else(|| self.search_base_form(&word))
    }

    /// Exact, case-insensitive lookup. Errors and a closed store both yield `None`.
    pub fn search_direct(&self, word: &str) -> Option<DictionaryEntry> {
        let entry = self.query(word, |conn| queries::search_direct(conn, word))?;
        trace!("direct lookup {:?}: {}", word, entry.is_some());
        entry
    }

    /// Whether `word` has an entry of its own, without building it
    pub fn has_entry(&self, word: &str) -> bool {
        self.query(word, |conn| queries::word_exists(conn, word)).unwrap_or(false)
    }

    fn query<T>(&self, word: &str, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> Option<T> {
        match self.dictionary.with_connection(f) {
            Ok(value) => Some(value),
            Err(e) if matches!(e.downcast_ref::<DatabaseError>(), Some(DatabaseError::Closed)) => {
                debug!("lookup of {:?} on closed dictionary", word);
                None
            }
            Err(e) => {
                warn!("dictionary lookup failed for {:?}: {}", word, e);
                None
            }
        }
    }

    fn search_without_abbreviation(&self, word: &str) -> Option<DictionaryEntry> {
        ['\'', '/']
            .iter()
            .filter_map(|&mark| word.rfind(mark).map(|at| &word[..at]))
            .filter(|prefix| !prefix.is_empty())
            .find_map(|prefix| self.search_direct(prefix))
    }

    fn search_base_form(&self, word: &str) -> Option<DictionaryEntry> {
        stemmer::base_form_candidates(word)
            .iter()
            .find_map(|candidate| self.search_direct(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NewEntry;

    fn seeded() -> DictionarySearch {
        let dict = Dictionary::open_in_memory().unwrap();
        dict.insert_entries(&[
            NewEntry::new("box", "箱"),
            NewEntry::new("try", "試す / 努力する"),
            NewEntry::new("run", "走る"),
            NewEntry::new("run", "運営する"),
            NewEntry::new("happy", "幸せな"),
            NewEntry::new("cat", "猫"),
            NewEntry::new("bake", "焼く"),
            NewEntry::new("hello", "こんにちは"),
            NewEntry::new("don", "首領"),
            NewEntry::new("and", "そして"),
            NewEntry::new("Tokyo", "東京"),
            NewEntry::new("pie", "パイ"),
        ])
        .unwrap();
        DictionarySearch::new(Arc::new(dict))
    }

    fn headword(search: &DictionarySearch, word: &str) -> Option<String> {
        search.search(word).map(|entry| entry.word)
    }

    #[test]
    fn test_trim_symbols() {
        assert_eq!(trim_symbols("(hello)").as_deref(), Some("hello"));
        assert_eq!(trim_symbols("hello,").as_deref(), Some("hello"));
        assert_eq!(trim_symbols("\"quoted\"").as_deref(), Some("quoted"));
        assert_eq!(trim_symbols("((twice))").as_deref(), Some("(twice)"));
        assert_eq!(trim_symbols("a").as_deref(), Some("a"));
        assert_eq!(trim_symbols("!"), None);
        assert_eq!(trim_symbols("()"), None);
        assert_eq!(trim_symbols(""), None);
    }

    #[test]
    fn test_direct_hit_is_case_insensitive() {
        let search = seeded();
        assert_eq!(headword(&search, "TOKYO").as_deref(), Some("Tokyo"));
        assert_eq!(headword(&search, "(hello)").as_deref(), Some("hello"));
    }

    #[test]
    fn test_multiple_rows_are_concatenated() {
        let search = seeded();
        let entry = search.search("run").unwrap();
        assert_eq!(entry.mean, "走る\n\n運営する\n\n");
    }

    #[test]
    fn test_base_forms() {
        let search = seeded();
        assert_eq!(headword(&search, "boxes").as_deref(), Some("box"));
        assert_eq!(headword(&search, "tried").as_deref(), Some("try"));
        assert_eq!(headword(&search, "running").as_deref(), Some("run"));
        assert_eq!(headword(&search, "happier").as_deref(), Some("happy"));
        assert_eq!(headword(&search, "cats").as_deref(), Some("cat"));
        assert_eq!(headword(&search, "baked").as_deref(), Some("bake"));
        assert_eq!(headword(&search, "Cats.").as_deref(), Some("cat"));
    }

    #[test]
    fn test_no_match() {
        let search = seeded();
        assert!(search.search("zebra").is_none());
        assert!(search.search("?").is_none());
    }

    #[test]
    fn test_first_suffix_wins_without_backtracking() {
        let search = seeded();
        // "ies" matches first and "py" misses; "pie" via "s" is never tried
        assert!(search.search("pies").is_none());
    }

    #[test]
    fn test_abbreviations() {
        let search = seeded();
        assert_eq!(headword(&search, "don't").as_deref(), Some("don"));
        assert_eq!(headword(&search, "cat's").as_deref(), Some("cat"));
        assert_eq!(headword(&search, "and/or").as_deref(), Some("and"));
    }

    #[test]
    fn test_closed_store_returns_none() {
        let search = seeded();
        search.dictionary().close();
        assert!(search.search("cat").is_none());
    }

    #[test]
    fn test_has_entry() {
        let search = seeded();
        assert!(search.has_entry("CAT"));
        assert!(!search.has_entry("cats"));

        search.dictionary().close();
        assert!(!search.has_entry("cat"));
    }
}
