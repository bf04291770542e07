//! Pattern output normalization and matching.
//!
//! A run output matches a target pattern iff their normalized forms are
//! byte-equal. Normalization is whitespace-insensitive at the line level but
//! sensitive to line content and line order.

/// Normalize a pattern text for comparison.
///
/// Line terminators are unified to `\n`, each line is trimmed, lines that
/// become empty are dropped, and the remainder is rejoined with `\n`.
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns true if `output` reproduces `target` after normalization.
pub fn matches(output: &str, target: &str) -> bool {
    normalize(output) == normalize(target)
}
