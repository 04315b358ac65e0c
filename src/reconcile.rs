//! Single-pass reconciliation driver.
//!
//! Phases, all synchronous and deterministic for a given input order:
//! 1. Index incoming records by unique code
//! 2. Exact pass: every base record with a code claims its incoming twin
//! 3. Fuzzy pass: remaining base records claim their best unused candidate
//! 4. Resolve fields for every base record
//! 5. Build the report

use indicatif::ProgressBar;
use std::time::Instant;

use crate::assign::AssignmentEngine;
use crate::config::{MergeConfig, Thresholds};
use crate::error::ConfigError;
use crate::identity::CodeIndex;
use crate::models::{MatchResult, MatchType, MergedRecord, TrackRecord};
use crate::progress::{log_progress, LOG_INTERVAL};
use crate::report::{Diagnostics, MergeReport, ProfileSummary, ReportContext};
use crate::resolve::resolve_record;
use crate::scoring::{score_prepared, PreparedName};

/// Output of one run: exactly one merged record per base record, in base order.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub merged: Vec<MergedRecord>,
    pub report: MergeReport,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    config: MergeConfig,
    thresholds: Thresholds,
}

impl Reconciler {
    /// Validates the configuration up front; an invalid config never starts a run.
    pub fn new(config: MergeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = config.thresholds();
        Ok(Self { config, thresholds })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn run(&self, base: &[TrackRecord], incoming: &[TrackRecord]) -> Reconciliation {
        self.run_with_progress(base, incoming, &ProgressBar::hidden())
    }

    /// Run with a progress bar advanced once per base record in the fuzzy pass.
    pub fn run_with_progress(
        &self,
        base: &[TrackRecord],
        incoming: &[TrackRecord],
        progress: &ProgressBar,
    ) -> Reconciliation {
        let start = Instant::now();

        let index = CodeIndex::build(incoming);
        tracing::info!(
            incoming = incoming.len(),
            codes = index.len(),
            duplicates = index.duplicate_codes(),
            "built code index"
        );

        let candidates: Vec<PreparedName> = incoming.iter().map(PreparedName::from_record).collect();
        let mut engine = AssignmentEngine::new(&candidates, self.thresholds, self.config.weights())
            .parallel(self.config.parallel);
        let mut matches = vec![MatchResult::unmatched(); base.len()];

        // Exact pass runs to completion first so no fuzzy match can take a
        // record some base record owns by code.
        let mut contested_codes = 0;
        for (row, record) in base.iter().enumerate() {
            let Some(idx) = index.lookup(record.code.as_deref()) else {
                continue;
            };
            if engine.claim(idx) {
                let name = PreparedName::from_record(record);
                let names = score_prepared(&name, &candidates[idx], self.config.weights());
                matches[row] = MatchResult::exact(idx, names);
            } else {
                contested_codes += 1;
                tracing::debug!(row, incoming_row = idx, "code already claimed by an earlier base record");
            }
        }
        let exact = matches.iter().filter(|m| m.is_matched()).count();
        tracing::info!(exact, contested_codes, "exact pass complete");

        let total = base.len() as u64;
        progress.set_length(total);
        for (row, record) in base.iter().enumerate() {
            progress.inc(1);
            log_progress("fuzzy", row as u64 + 1, total, LOG_INTERVAL);
            if matches[row].is_matched() {
                continue;
            }
            let name = PreparedName::from_record(record);
            if name.is_blank() {
                tracing::debug!(row, "base record has no artist or title, skipping fuzzy search");
                continue;
            }
            if let Some(found) = engine.assign(&name) {
                tracing::debug!(
                    row,
                    incoming_row = found.index,
                    score = found.scores.combined_score,
                    "fuzzy match"
                );
                matches[row] = MatchResult::fuzzy(found.index, found.scores);
            }
        }
        progress.finish_and_clear();
        tracing::info!(
            fuzzy = matches.iter().filter(|m| m.match_type == MatchType::Fuzzy).count(),
            unused_incoming = engine.unused_count(),
            "fuzzy pass complete"
        );

        let merged: Vec<MergedRecord> = base
            .iter()
            .zip(matches)
            .enumerate()
            .map(|(row, (record, result))| {
                let matched = result.incoming_index.and_then(|i| incoming.get(i));
                resolve_record(row, record, matched, result)
            })
            .collect();

        let mut report = MergeReport::build(
            &merged,
            ReportContext {
                base,
                incoming,
                profile: ProfileSummary {
                    name: self.config.profile,
                    thresholds: self.thresholds,
                    weights: self.config.weights(),
                    low_confidence_margin: self.config.low_confidence_margin,
                },
                sample_limit: self.config.sample_limit,
                diagnostics: Diagnostics {
                    duplicate_incoming_codes: index.duplicate_codes(),
                    contested_codes,
                },
            },
        );
        report.elapsed_seconds = start.elapsed().as_secs_f64();

        Reconciliation { merged, report }
    }
}

/// Convenience wrapper: validate `config` and run once.
pub fn reconcile(
    base: &[TrackRecord],
    incoming: &[TrackRecord],
    config: MergeConfig,
) -> Result<Reconciliation, ConfigError> {
    Ok(Reconciler::new(config)?.run(base, incoming))
}
