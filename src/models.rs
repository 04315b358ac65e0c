//! Core data models for track reconciliation.
//!
//! This module contains the input record type, per-base-record match
//! results, provenance tags and the merged output record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::SimilarityScores;

/// At most this many subgenre tags are carried per record.
pub const MAX_SUBGENRES: usize = 3;

// ============================================================================
// Input Models
// ============================================================================

/// Human-verification flags, one per resolvable field group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionFlags {
    pub energy: bool,
    pub accessibility: bool,
    pub explicit: bool,
    pub subgenres: bool,
}

impl CorrectionFlags {
    /// Every field group verified.
    pub fn all() -> Self {
        Self {
            energy: true,
            accessibility: true,
            explicit: true,
            subgenres: true,
        }
    }

    pub fn any(&self) -> bool {
        self.energy || self.accessibility || self.explicit || self.subgenres
    }
}

/// One track from either the base or the incoming collection.
/// Read-only once parsed; the engine never mutates inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRecord {
    pub artist: String,
    pub title: String,
    /// Unique recording code (e.g. ISRC). Blank and null sentinels mean "no code".
    #[serde(alias = "isrc")]
    pub code: Option<String>,
    pub energy: Option<String>,
    #[serde(alias = "category")]
    pub accessibility: Option<String>,
    pub explicit: Option<String>,
    pub subgenres: Vec<String>,
    pub corrections: CorrectionFlags,
}

impl TrackRecord {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_energy(mut self, value: impl Into<String>) -> Self {
        self.energy = Some(value.into());
        self
    }

    pub fn with_accessibility(mut self, value: impl Into<String>) -> Self {
        self.accessibility = Some(value.into());
        self
    }

    pub fn with_explicit(mut self, value: impl Into<String>) -> Self {
        self.explicit = Some(value.into());
        self
    }

    pub fn with_subgenres<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subgenres = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_corrections(mut self, corrections: CorrectionFlags) -> Self {
        self.corrections = corrections;
        self
    }

    /// Blank strings become absent values and subgenres are capped at
    /// `MAX_SUBGENRES`. Applied by the dataset readers after parsing.
    pub fn sanitized(mut self) -> Self {
        self.artist = self.artist.trim().to_string();
        self.title = self.title.trim().to_string();
        self.code = non_blank(self.code);
        self.energy = non_blank(self.energy);
        self.accessibility = non_blank(self.accessibility);
        self.explicit = non_blank(self.explicit);
        self.subgenres = self
            .subgenres
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_SUBGENRES)
            .collect();
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Match Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Identity established via a shared unique code.
    Exact,
    /// Identity established via name similarity above every threshold.
    Fuzzy,
    #[serde(rename = "none")]
    Unmatched,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Unmatched => "none",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one base record. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_type: MatchType,
    pub combined_score: f64,
    pub artist_score: f64,
    pub title_score: f64,
    /// Index of the matched record in the incoming collection.
    pub incoming_index: Option<usize>,
}

impl MatchResult {
    /// A code collision always scores 1.0 combined. The per-axis scores are
    /// the real name similarities, so renamed or mislabelled codes stay visible.
    pub fn exact(incoming_index: usize, names: SimilarityScores) -> Self {
        Self {
            match_type: MatchType::Exact,
            combined_score: 1.0,
            artist_score: names.artist_score,
            title_score: names.title_score,
            incoming_index: Some(incoming_index),
        }
    }

    pub fn fuzzy(incoming_index: usize, scores: SimilarityScores) -> Self {
        Self {
            match_type: MatchType::Fuzzy,
            combined_score: scores.combined_score,
            artist_score: scores.artist_score,
            title_score: scores.title_score,
            incoming_index: Some(incoming_index),
        }
    }

    pub fn unmatched() -> Self {
        Self {
            match_type: MatchType::Unmatched,
            combined_score: 0.0,
            artist_score: 0.0,
            title_score: 0.0,
            incoming_index: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.incoming_index.is_some()
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Which source supplied a merged field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Human-verified value from the base record.
    UserCorrected,
    /// Existing value from the base record.
    Cache,
    /// Freshly produced value from the matched incoming record.
    Incoming,
    /// No source had a value.
    #[serde(rename = "none")]
    Absent,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::UserCorrected => "user_corrected",
            Provenance::Cache => "cache",
            Provenance::Incoming => "incoming",
            Provenance::Absent => "none",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved field value paired with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    pub value: Option<T>,
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    pub fn absent() -> Self {
        Self {
            value: None,
            provenance: Provenance::Absent,
        }
    }
}

/// One output row per base record.
///
/// ## Key Invariants
///
/// 1. `artist` and `title` always come from the base record.
/// 2. Every resolvable field is present (possibly empty) with a provenance tag.
/// 3. A field flagged user-corrected on the base holds the base value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergedRecord {
    /// Position of the originating record in the base collection.
    pub base_index: usize,
    pub artist: String,
    pub title: String,
    pub code: Option<String>,
    pub energy: Resolved<String>,
    pub accessibility: Resolved<String>,
    pub explicit: Resolved<String>,
    pub subgenres: Resolved<Vec<String>>,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
}

// ============================================================================
// TESTS
// ============================================================================
