use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

// Pre-compiled regex for whitespace normalization (compile once, use many times)
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex pattern")
});

/// Canonical form used to compare extracted text with live page text:
/// whitespace runs collapsed to one space, trimmed, lowercased
pub fn normalize(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_lowercase()
}

/// Words of a normalized string that count for similarity (longer than 2 chars)
fn significant_words(text: &str) -> HashSet<&str> {
    text.split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .collect()
}

/// Jaccard index over the significant word sets of two normalized strings.
///
/// Returns 0.0 when either side has no significant words.
pub fn similarity(a: &str, b: &str) -> f64 {
    let words_a = significant_words(a);
    let words_b = significant_words(b);

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let shared = words_a.intersection(&words_b).count();
    let union = words_a.len() + words_b.len() - shared;
    shared as f64 / union as f64
}
