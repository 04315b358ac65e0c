//! Quality report over one reconciliation run.
//!
//! The report is derived entirely from the merged records plus the two
//! input collections and is read-only once built.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{MatchProfile, Thresholds};
use crate::models::{MatchType, MergedRecord, Provenance, TrackRecord};
use crate::resolve::FieldGroup;
use crate::scoring::Weights;

// ============================================================================
// Report Sections
// ============================================================================

/// The thresholds and weights the run actually used.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name: MatchProfile,
    pub thresholds: Thresholds,
    pub weights: Weights,
    pub low_confidence_margin: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total_base: usize,
    pub total_incoming: usize,
    #[serde(rename = "isrc_exact")]
    pub exact: usize,
    pub fuzzy: usize,
    /// Base records left without a match.
    #[serde(rename = "unmatched_cache")]
    pub unmatched_base: usize,
    /// Incoming records no base record claimed.
    #[serde(rename = "unmatched_enriched")]
    pub unmatched_incoming: usize,
}

impl MatchSummary {
    /// Percentage of base records that found a match.
    pub fn match_rate(&self) -> f64 {
        if self.total_base == 0 {
            0.0
        } else {
            100.0 * (self.exact + self.fuzzy) as f64 / self.total_base as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ScoreDistribution {
    /// `None` for an empty slice.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let count = sorted.len();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            median,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceCounts {
    pub user_corrected: usize,
    pub cache: usize,
    pub incoming: usize,
    pub none: usize,
}

impl ProvenanceCounts {
    fn record(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::UserCorrected => self.user_corrected += 1,
            Provenance::Cache => self.cache += 1,
            Provenance::Incoming => self.incoming += 1,
            Provenance::Absent => self.none += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreservationCounts {
    /// Records whose energy or accessibility kept a user-corrected value.
    pub energy_category_user_corrected: usize,
    /// Records whose explicit rating kept the base value.
    pub explicit_cache: usize,
    pub by_field: BTreeMap<FieldGroup, ProvenanceCounts>,
}

/// A matched pair, for manual spot-checking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSample {
    pub base_row: usize,
    pub incoming_row: usize,
    pub base_artist: String,
    pub base_title: String,
    pub incoming_artist: String,
    pub incoming_title: String,
    pub artist_score: f64,
    pub title_score: f64,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LowConfidence {
    /// Total fuzzy matches within the margin above the combined threshold.
    pub count: usize,
    /// `combined_threshold + low_confidence_margin`.
    pub below: f64,
    pub samples: Vec<MatchSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub duplicate_incoming_codes: usize,
    /// Base records whose code hit an incoming record already claimed by an
    /// earlier base record.
    pub contested_codes: usize,
}

// ============================================================================
// Merge Report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub profile: ProfileSummary,
    pub summary: MatchSummary,
    pub match_rate: f64,
    /// Distribution over fuzzy matches only.
    pub fuzzy_scores: Option<ScoreDistribution>,
    pub preservation: PreservationCounts,
    pub fuzzy_samples: Vec<MatchSample>,
    pub low_confidence: LowConfidence,
    pub diagnostics: Diagnostics,
    pub elapsed_seconds: f64,
}

/// Inputs the report needs besides the merged records.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub base: &'a [TrackRecord],
    pub incoming: &'a [TrackRecord],
    pub profile: ProfileSummary,
    pub sample_limit: usize,
    pub diagnostics: Diagnostics,
}

impl MergeReport {
    pub fn build(merged: &[MergedRecord], ctx: ReportContext<'_>) -> Self {
        let mut summary = MatchSummary {
            total_base: ctx.base.len(),
            total_incoming: ctx.incoming.len(),
            ..MatchSummary::default()
        };
        let mut preservation = PreservationCounts::default();
        for group in FieldGroup::ALL {
            preservation.by_field.insert(group, ProvenanceCounts::default());
        }

        let low_confidence_below = ctx.profile.thresholds.combined + ctx.profile.low_confidence_margin;
        let mut low_confidence = LowConfidence {
            below: low_confidence_below,
            ..LowConfidence::default()
        };
        let mut fuzzy_scores = Vec::new();
        let mut fuzzy_samples = Vec::new();

        for record in merged {
            match record.match_result.match_type {
                MatchType::Exact => summary.exact += 1,
                MatchType::Fuzzy => {
                    summary.fuzzy += 1;
                    let score = record.match_result.combined_score;
                    fuzzy_scores.push(score);
                    let sample = || sample_for(record, &ctx);
                    if fuzzy_samples.len() < ctx.sample_limit {
                        fuzzy_samples.extend(sample());
                    }
                    if score < low_confidence_below {
                        low_confidence.count += 1;
                        if low_confidence.samples.len() < ctx.sample_limit {
                            low_confidence.samples.extend(sample());
                        }
                    }
                }
                MatchType::Unmatched => summary.unmatched_base += 1,
            }

            for group in FieldGroup::ALL {
                if let Some(counts) = preservation.by_field.get_mut(&group) {
                    counts.record(record.provenance(group));
                }
            }
            if record.energy.provenance == Provenance::UserCorrected
                || record.accessibility.provenance == Provenance::UserCorrected
            {
                preservation.energy_category_user_corrected += 1;
            }
            if record.explicit.provenance == Provenance::Cache {
                preservation.explicit_cache += 1;
            }
        }

        summary.unmatched_incoming = summary.total_incoming.saturating_sub(summary.exact + summary.fuzzy);

        Self {
            profile: ctx.profile,
            match_rate: summary.match_rate(),
            summary,
            fuzzy_scores: ScoreDistribution::from_scores(&fuzzy_scores),
            preservation,
            fuzzy_samples,
            low_confidence,
            diagnostics: ctx.diagnostics,
            elapsed_seconds: 0.0,
        }
    }

    /// Log the headline numbers through `tracing`.
    pub fn log_summary(&self) {
        let s = &self.summary;
        tracing::info!(
            total_base = s.total_base,
            total_incoming = s.total_incoming,
            isrc_exact = s.exact,
            fuzzy = s.fuzzy,
            unmatched_cache = s.unmatched_base,
            unmatched_enriched = s.unmatched_incoming,
            "match summary ({:.1}% matched)",
            self.match_rate
        );
        if let Some(dist) = &self.fuzzy_scores {
            tracing::info!(
                min = dist.min,
                max = dist.max,
                mean = dist.mean,
                median = dist.median,
                "fuzzy score distribution"
            );
        }
        if self.low_confidence.count > 0 {
            tracing::warn!(
                count = self.low_confidence.count,
                below = self.low_confidence.below,
                "low-confidence fuzzy matches need review"
            );
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report to a JSON file
    pub fn write_to_file(&self, path: &Path) -> crate::error::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn sample_for(record: &MergedRecord, ctx: &ReportContext<'_>) -> Option<MatchSample> {
    let incoming_row = record.match_result.incoming_index?;
    let incoming = ctx.incoming.get(incoming_row)?;
    Some(MatchSample {
        base_row: record.base_index,
        incoming_row,
        base_artist: record.artist.clone(),
        base_title: record.title.clone(),
        incoming_artist: incoming.artist.clone(),
        incoming_title: incoming.title.clone(),
        artist_score: record.match_result.artist_score,
        title_score: record.match_result.title_score,
        combined_score: record.match_result.combined_score,
    })
}

// ============================================================================
// TESTS
// ============================================================================
