//! Text clean-up applied to recognized field text.

/// Turns newlines into spaces, collapses whitespace runs and trims the ends.
pub fn reduce_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes every occurrence of the given words (whole words, case-sensitive)
/// and normalizes the remaining whitespace.
pub fn remove_words(text: &str, words: &[&str]) -> String {
    text.split_whitespace()
        .filter(|token| !words.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
