//! Tokenization for the lexical index: lowercase word-like tokens (internal
//! hyphens, dots, and underscores allowed), stop words and single-character
//! tokens dropped.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-zA-Z0-9][\w\-\.]*[a-zA-Z0-9]\b|\b\w\b").expect("valid regex")
});

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let words: &[&str] = &[
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
        "be", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "may", "might", "must", "shall", "can", "need",
        "this", "that", "these", "those", "it", "its", "they", "them",
        "their", "what", "which", "who", "whom", "when", "where", "why", "how",
        "all", "each", "every", "both", "few", "more", "most", "other",
        "some", "such", "no", "nor", "not", "only", "own", "same", "so",
        "than", "too", "very", "just", "also", "now", "here", "there",
        "about", "into", "over", "after", "below", "between", "under",
        "again", "then", "once", "during", "while", "before", "above",
        "being", "through", "further", "because", "until",
    ];
    words.iter().copied().collect()
});

/// Tokenize `text` for indexing or querying. Duplicates are preserved in
/// order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(t.as_str()))
        .collect()
}
