//! Task pattern extraction.
//!
//! Turns a free-text task description into a stable, order-independent
//! fingerprint used as the learning key, plus a coarse task mode. Pure
//! functions, no I/O.

use crate::domain::TaskMode;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Fingerprint used when the description has no usable tokens.
pub const EMPTY_PATTERN: &str = "~empty";

/// Tokens shorter than this are noise, not signal.
const MIN_TOKEN_LEN: usize = 4;

/// How many sorted tokens make up a fingerprint.
const FINGERPRINT_TOKENS: usize = 5;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "this", "that", "with", "from", "when", "then", "than", "them", "they", "there", "where",
        "which", "while", "should", "would", "could", "about", "after", "before", "into", "onto",
        "does", "doesn", "have", "been", "being", "because", "some", "same", "only", "also",
        "make", "made", "need", "needs", "want", "using", "used", "uses",
    ]
    .into_iter()
    .collect()
});

/// Ordered keyword families for mode detection; first match wins.
const MODE_KEYWORDS: &[(TaskMode, &[&str])] = &[
    (TaskMode::Debug, &["fix", "bug", "error", "broken", "crash", "issue", "fail"]),
    (TaskMode::Feature, &["add", "implement", "create", "support", "introduce"]),
    (TaskMode::Refactor, &["refactor", "clean", "reorganize", "restructure", "simplify"]),
    (TaskMode::Test, &["test", "spec", "coverage"]),
];

/// Extracted `(mode, fingerprint)` pair for one task description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPattern {
    pub mode: TaskMode,
    pub fingerprint: String,
}

/// Extract the task pattern from a description.
///
/// The fingerprint is order-independent by construction: tokens are
/// sorted lexically before the first five are joined, so "sessions
/// expire fast" and "fast sessions expire" produce the same key.
pub fn extract(task: &str) -> TaskPattern {
    TaskPattern { mode: detect_mode(task), fingerprint: fingerprint(task) }
}

/// Compute the learning-key fingerprint for a task description.
pub fn fingerprint(task: &str) -> String {
    let mut tokens = significant_tokens(task);
    tokens.sort();
    tokens.dedup();

    if tokens.is_empty() {
        return EMPTY_PATTERN.to_string();
    }
    tokens.truncate(FINGERPRINT_TOKENS);
    tokens.join("-")
}

/// Classify the task into a coarse mode via ordered keyword families.
pub fn detect_mode(task: &str) -> TaskMode {
    let tokens = tokenize(task);
    for (mode, keywords) in MODE_KEYWORDS {
        // Prefix match so "fixing" and "errors" still classify.
        if tokens.iter().any(|t| keywords.iter().any(|k| t.starts_with(k))) {
            return *mode;
        }
    }
    TaskMode::General
}

/// Tokens that carry meaning: long enough and not stop words. These are
/// the "task tokens" both the fingerprint and the keyword signal use.
pub fn significant_tokens(task: &str) -> Vec<String> {
    tokenize(task)
        .into_iter()
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t.as_str()))
        .collect()
}

/// Lowercased whitespace tokens with punctuation trimmed from the edges.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
