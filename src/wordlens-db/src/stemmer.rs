//! English inflection suffixes and the base forms they point at

/// How a matched suffix is undone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixRule {
    /// tried -> try
    ReplaceWithY,
    /// running -> run, then the `DropOrE` forms
    UndoubleConsonant,
    /// boxes -> boxe, box
    DropOrE,
    /// cats -> cat
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suffix {
    pub text: &'static str,
    pub rule: SuffixRule,
}

impl Suffix {
    const fn new(text: &'static str, rule: SuffixRule) -> Self {
        Self { text, rule }
    }
}

/// Checked in this order; the first match is the only one tried
pub const SUFFIXES: [Suffix; 10] = [
    Suffix::new("ied", SuffixRule::ReplaceWithY),
    Suffix::new("ies", SuffixRule::ReplaceWithY),
    Suffix::new("ier", SuffixRule::ReplaceWithY),
    Suffix::new("iest", SuffixRule::ReplaceWithY),
    Suffix::new("ing", SuffixRule::UndoubleConsonant),
    Suffix::new("ed", SuffixRule::UndoubleConsonant),
    Suffix::new("er", SuffixRule::UndoubleConsonant),
    Suffix::new("est", SuffixRule::UndoubleConsonant),
    Suffix::new("es", SuffixRule::DropOrE),
    Suffix::new("s", SuffixRule::Drop),
];

/// First suffix in [`SUFFIXES`] that `word` ends with and is strictly longer than
pub fn match_suffix(word: &str) -> Option<&'static Suffix> {
    let len = word.chars().count();
    SUFFIXES
        .iter()
        .find(|suffix| suffix.text.len() < len && word.ends_with(suffix.text))
}

/// Base forms to look up for `word`, most specific first.
///
/// Only the first matching suffix contributes; shorter suffixes are never
/// retried when its candidates all miss.
pub fn base_form_candidates(word: &str) -> Vec<String> {
    let Some(suffix) = match_suffix(word) else {
        return Vec::new();
    };
    // suffixes are ASCII, so this is a char boundary
    let stem = &word[..word.len() - suffix.text.len()];

    match suffix.rule {
        SuffixRule::ReplaceWithY => vec![format!("{}y", stem)],
        SuffixRule::Drop => vec![stem.to_string()],
        SuffixRule::DropOrE => vec![format!("{}e", stem), stem.to_string()],
        SuffixRule::UndoubleConsonant => {
            let mut candidates = Vec::with_capacity(3);
            let mut tail = stem.char_indices().rev();
            if let (Some((last_at, last)), Some((_, before))) = (tail.next(), tail.next()) {
                // the doubled letter must not be the first one
                if last == before && stem.chars().count() > 2 {
                    candidates.push(stem[..last_at].to_string());
                }
            }
            candidates.push(format!("{}e", stem));
            candidates.push(stem.to_string());
            candidates
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_suffix_order() {
        assert_eq!(match_suffix("tries").unwrap().text, "ies");
        assert_eq!(match_suffix("happiest").unwrap().text, "iest");
        assert_eq!(match_suffix("boxes").unwrap().text, "es");
        assert_eq!(match_suffix("cats").unwrap().text, "s");
        assert!(match_suffix("cat").is_none());
    }

    #[test]
    fn test_suffix_must_be_shorter_than_word() {
        assert!(match_suffix("s").is_none());
        assert_eq!(match_suffix("es").unwrap().text, "s");
        assert!(match_suffix("ing").is_none());
    }

    #[test]
    fn test_candidates() {
        assert_eq!(base_form_candidates("tried"), ["try"]);
        assert_eq!(base_form_candidates("happier"), ["happy"]);
        assert_eq!(base_form_candidates("boxes"), ["boxe", "box"]);
        assert_eq!(base_form_candidates("cats"), ["cat"]);
        assert_eq!(base_form_candidates("running"), ["run", "runne", "runn"]);
        assert_eq!(base_form_candidates("baked"), ["bake", "bak"]);
        assert!(base_form_candidates("word").is_empty());
    }

    #[test]
    fn test_doubled_letter_needs_a_preceding_letter() {
        // a two-letter stem is never undoubled
        assert_eq!(base_form_candidates("eeing"), ["eee", "ee"]);
    }
}
