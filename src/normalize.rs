//! Name canonicalization shared by identity matching and fuzzy scoring.
//!
//! All functions here are pure and total: absent or empty input yields an
//! empty string or an empty set, never an error.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Title decorations removed before title comparison (applied in order).
/// Featured credits and release tags differ between sources for the same song.
pub static TITLE_TAG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Featured artists: "(feat. Artist)", "[ft. Someone]"
        Regex::new(r"(?i)\s*[\(\[](?:feat\.?|ft\.?|featuring)\s+[^)\]]+[\)\]]").unwrap(),
        // Remaster variants: "- Remastered 2011", "- 2009 Remaster", "/ 1997 Remastered"
        Regex::new(r"(?i)\s*[-–—/]\s*(?:remaster(?:ed)?(?:\s+\d{4})?|\d{4}\s+(?:digital\s+)?remaster(?:ed)?)\s*$").unwrap(),
        Regex::new(r"(?i)\s*[\(\[](?:remaster(?:ed)?(?:\s+\d{4})?|\d{4}\s+remaster(?:ed)?)[\)\]]").unwrap(),
        // Edition variants: "(Deluxe Edition)", "[Super Deluxe]"
        Regex::new(r"(?i)\s*[\(\[](?:deluxe|super\s+deluxe|expanded|anniversary|special)(?:\s+edition)?[\)\]]").unwrap(),
        // Mix/version variants: "(Radio Edit)", "[Album Version]", "(Mono)"
        Regex::new(r"(?i)\s*[\(\[](?:radio\s+edit|single\s+version|album\s+version|original\s+mix|mono|stereo)[\)\]]").unwrap(),
        Regex::new(r"(?i)\s*[-–—]\s*(?:radio\s+edit|single\s+version|album\s+version)\s*$").unwrap(),
        // Feat without brackets: "Song feat. Artist"
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+.+$").unwrap(),
    ]
});

/// "(with Justin Bieber)" is a credit; "(With Me)" is part of the title.
static WITH_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[\(\[]with\s+([^)\]]+)[\)\]]").unwrap());

/// First words after "with" that mark lyrics rather than an artist credit.
const WITH_LYRIC_WORDS: &[&str] = &[
    "me", "you", "u", "us", "him", "her", "them", "it", "my", "your", "our", "his", "their", "love",
];

/// Separators between credited artists: "A, B" and "A & B".
const ARTIST_SEPARATORS: [char; 2] = [',', '&'];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD decomposition, combining marks
/// dropped, remaining non-ASCII transliterated.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Canonical form of a free-text name: folded to lowercase ASCII,
/// punctuation removed, whitespace collapsed and trimmed.
pub fn normalize(text: &str) -> String {
    let folded = fold_to_ascii(text);
    let stripped: String = folded
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a credited-artist string into its canonical artist names.
/// "Ed Sheeran & Justin Bieber" and "Ed Sheeran, Justin Bieber" yield the same set.
pub fn split_artists(text: &str) -> BTreeSet<String> {
    text.split(ARTIST_SEPARATORS)
        .map(normalize)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Remove featured-artist credits and release tags from a title, keeping
/// the original casing and punctuation of what remains.
pub fn clean_title(title: &str) -> String {
    let mut result = WITH_CREDIT
        .replace_all(title, |caps: &Captures| {
            let first_word = caps[1]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            if WITH_LYRIC_WORDS.contains(&first_word.as_str()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .to_string();
    for pattern in TITLE_TAG_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    result.trim().to_string()
}

/// Canonical title used for comparison: `normalize(clean_title(title))`.
pub fn normalize_title(title: &str) -> String {
    normalize(&clean_title(title))
}

// ============================================================================
// TESTS
// ============================================================================
