//! Utility functions for string processing.

#[cfg(feature = "unicode-normalization")]
use unicode_normalization::UnicodeNormalization;

/// Normalize a string for matching: lowercase, strip diacritics, and collapse whitespace.
///
/// Lets plain-ASCII queries find accented text:
/// - "Café" → "cafe"
/// - "naïve  search" → "naive search"
///
/// # Algorithm (with unicode-normalization feature)
///
/// 1. NFD normalize (decompose characters into base + combining marks)
/// 2. Filter out combining marks
/// 3. Lowercase
/// 4. Collapse whitespace
#[cfg(feature = "unicode-normalization")]
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase and collapse whitespace. Used when the unicode-normalization feature is off.
#[cfg(not(feature = "unicode-normalization"))]
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "unicode-normalization")]
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |  // Combining Diacritical Marks
        '\u{1AB0}'..='\u{1AFF}' |  // Combining Diacritical Marks Extended
        '\u{1DC0}'..='\u{1DFF}' |  // Combining Diacritical Marks Supplement
        '\u{20D0}'..='\u{20FF}' |  // Combining Diacritical Marks for Symbols
        '\u{FE20}'..='\u{FE2F}'    // Combining Half Marks
    )
}

/// Strip control characters and NUL from crawler-supplied text.
///
/// Crawled pages carry all sorts of junk (form feeds, stray `\0` from broken
/// encodings) that Postgres-style stores reject and terminals render badly.
/// Whitespace controls go too; the crawler already flattened layout.
pub fn sanitize_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// `sanitize_text` for optional fields.
pub fn sanitize_opt(text: Option<&str>) -> Option<String> {
    text.map(sanitize_text)
}
