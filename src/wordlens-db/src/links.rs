use regex::Regex;
use std::sync::LazyLock;

use crate::schema::{DictionaryEntry, LinkSpan};
use crate::search::DictionarySearch;

/// Runs of two or more ASCII letters
static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]{2,}").expect("link pattern is a valid regex"));

/// English words in `entry`'s definition that have their own entry.
///
/// The headword itself is never linked.
pub fn find_links(entry: &DictionaryEntry, search: &DictionarySearch) -> Vec<LinkSpan> {
    LINK_PATTERN
        .find_iter(&entry.mean)
        .filter(|m| !m.as_str().eq_ignore_ascii_case(&entry.word))
        .filter(|m| search.has_entry(m.as_str()))
        .map(|m| LinkSpan {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
        })
        .collect()
}
