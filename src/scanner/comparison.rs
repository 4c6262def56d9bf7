//! String predicates and title distance used by the matcher and hydrator.

use regex::Regex;
use std::sync::LazyLock;

static SPECIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Show - OVA 02", "Show SP1", "Show ONA 3-4"
        r"(?i)(?:^|[ _.\-(\[]+)(?:SP|OAV|OVA|OAD|ONA) ?\d{1,2}(?:-\d{1,3})?(?:[ _.\-)\]]|$)",
        // "Show (OVA)", "Show.ONA.mkv"
        r"(?i)[-._( \[](?:OVA|ONA|OAV|OAD)[-._) \]]",
        // "Show S00E03", "Show SP00E1"
        r"(?i)[-._ ](?:S|SP)(?:0|00)E\d",
        // Upper-case markers only, so titles like "Spy" or "Special A" pass.
        r"\b(?:OVA|ONA|OAV|OAD|SP|SPECIALS?)\b",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static NC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:^|[ _.\-(\[]+)(?:NCOP|NCED|OPED|OP|ED)(?: ?\d{1,2}[a-z]?)?(?:[ _.\-)\]]|$)",
        r"(?i)(?:^|[ _.\-(\[]+)(?:TRAILER|PROMO|PV|PREVIEW)(?: ?\d{1,2})?(?:[ _.\-)\]]|$)",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Whether `value` (usually a file name) marks a special episode.
pub fn contains_special(value: &str) -> bool {
    SPECIAL_PATTERNS.iter().any(|re| re.is_match(value))
}

/// Whether `value` marks non-canonical content (openings, endings, trailers).
pub fn contains_nc(value: &str) -> bool {
    NC_PATTERNS.iter().any(|re| re.is_match(value))
}

/// Case-fold and collapse whitespace so titles compare on content only.
pub fn normalize_title(value: &str) -> String {
    value
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive Levenshtein distance between two titles.
pub fn title_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&normalize_title(a), &normalize_title(b))
}
