//! Similarity scoring between track names.
//!
//! This module contains:
//! - Bounded string similarity from Levenshtein distance
//! - Artist similarity over credited-artist sets (max-over-pairs)
//! - Title similarity on cleaned titles
//! - The weighted artist/title combined score

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::TrackRecord;
use crate::normalize::{normalize, normalize_title, split_artists};

// ============================================================================
// Weights
// ============================================================================

/// Relative weight of artist and title in the combined score.
/// Titles are more discriminating than common artist names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub artist: f64,
    pub title: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            artist: crate::config::DEFAULT_ARTIST_WEIGHT,
            title: crate::config::DEFAULT_TITLE_WEIGHT,
        }
    }
}

/// Scores for one base/candidate pair, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SimilarityScores {
    pub artist_score: f64,
    pub title_score: f64,
    pub combined_score: f64,
}

// ============================================================================
// String Similarity
// ============================================================================

/// Similarity of two already-canonical strings.
/// `1 - levenshtein / max_len`, with identical strings scoring 1.0 and an
/// empty side scoring 0.0.
pub fn canonical_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / max_len as f64
}

/// Compute similarity between two free-text strings (0.0 to 1.0).
/// Both sides are normalized first.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    canonical_similarity(&normalize(a), &normalize(b))
}

/// Best similarity across every pair of credited artists.
/// Handles featured-artist reordering and differing separator conventions.
pub fn artist_set_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let mut best: f64 = 0.0;
    for left in a {
        for right in b {
            let similarity = canonical_similarity(left, right);
            if similarity == 1.0 {
                return 1.0;
            }
            best = best.max(similarity);
        }
    }
    best
}

pub fn artist_similarity(a: &str, b: &str) -> f64 {
    artist_set_similarity(&split_artists(a), &split_artists(b))
}

pub fn title_similarity(a: &str, b: &str) -> f64 {
    canonical_similarity(&normalize_title(a), &normalize_title(b))
}

// ============================================================================
// Prepared Names
// ============================================================================

/// Canonical artist set and title for one record, computed once per run so
/// the candidate scan never re-normalizes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedName {
    pub artists: BTreeSet<String>,
    pub title: String,
}

impl PreparedName {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artists: split_artists(artist),
            title: normalize_title(title),
        }
    }

    pub fn from_record(record: &TrackRecord) -> Self {
        Self::new(&record.artist, &record.title)
    }

    /// A name with neither artist nor title can never produce a fuzzy match.
    pub fn is_blank(&self) -> bool {
        self.artists.is_empty() && self.title.is_empty()
    }
}

// ============================================================================
// Combined Scoring
// ============================================================================

pub fn score_prepared(base: &PreparedName, candidate: &PreparedName, weights: Weights) -> SimilarityScores {
    let artist_score = artist_set_similarity(&base.artists, &candidate.artists);
    let title_score = canonical_similarity(&base.title, &candidate.title);
    SimilarityScores {
        artist_score,
        title_score,
        // Weights sum to 1.0 only up to float rounding.
        combined_score: (weights.artist * artist_score + weights.title * title_score).clamp(0.0, 1.0),
    }
}

/// Weighted artist/title score between a base record and a candidate.
pub fn combined_score(base: &TrackRecord, candidate: &TrackRecord, weights: Weights) -> SimilarityScores {
    score_prepared(
        &PreparedName::from_record(base),
        &PreparedName::from_record(candidate),
        weights,
    )
}

// ============================================================================
// TESTS
// ============================================================================
