//! Answer comparison helpers.

use strsim::normalized_levenshtein;

/// Lowercase, trim and collapse inner whitespace.
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case- and whitespace-insensitive edit-distance match.
///
/// `threshold` is the minimum normalised Levenshtein similarity in `[0, 1]`; `1.0` requires an
/// exact match after normalisation.
pub fn fuzzy_matches(submitted: &str, expected: &str, threshold: f64) -> bool {
    let submitted = normalize(submitted);
    let expected = normalize(expected);
    if submitted.is_empty() || expected.is_empty() {
        return false;
    }
    if submitted == expected {
        return true;
    }

    normalized_levenshtein(&submitted, &expected) >= threshold
}

/// Exact match on trimmed display text, used for choice-based answers.
pub fn exact_matches(submitted: &str, expected: &str) -> bool {
    submitted.trim() == expected.trim()
}

/// Split a combined `"title - artist"` answer on the first separator.
pub fn split_combined(value: &str) -> Option<(&str, &str)> {
    let (title, artist) = value.split_once(" - ")?;
    let (title, artist) = (title.trim(), artist.trim());
    (!title.is_empty() && !artist.is_empty()).then_some((title, artist))
}
