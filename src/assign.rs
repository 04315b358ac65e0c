//! Greedy one-to-one fuzzy assignment of incoming records to base records.
//!
//! Each base record without an exact match scans every not-yet-used
//! incoming record and claims the best candidate that clears all three
//! thresholds. Greedy, not globally optimal: with near-ties between base
//! records the outcome depends on base iteration order.
//!
//! The scan is O(N_base × N_incoming). Blocking by a cheap key (e.g. first
//! letters of the normalized title) would cut the candidate sets without
//! changing acceptance semantics.

use rayon::prelude::*;

use crate::config::Thresholds;
use crate::scoring::{score_prepared, PreparedName, SimilarityScores, Weights};

/// A qualifying candidate: index into the incoming collection plus its scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub scores: SimilarityScores,
}

impl Candidate {
    /// Higher combined score wins; on a tie the earlier input position wins.
    fn better_than(&self, other: &Candidate) -> bool {
        self.scores.combined_score > other.scores.combined_score
            || (self.scores.combined_score == other.scores.combined_score && self.index < other.index)
    }
}

fn qualify(
    index: usize,
    base: &PreparedName,
    candidate: &PreparedName,
    thresholds: &Thresholds,
    weights: Weights,
) -> Option<Candidate> {
    let scores = score_prepared(base, candidate, weights);
    thresholds
        .accepts(scores.artist_score, scores.title_score, scores.combined_score)
        .then_some(Candidate { index, scores })
}

/// Best qualifying unused candidate for `base`, scanning in input order.
/// Pure: reads `used` but never writes it.
pub fn find_best_candidate(
    base: &PreparedName,
    candidates: &[PreparedName],
    used: &[bool],
    thresholds: &Thresholds,
    weights: Weights,
) -> Option<Candidate> {
    if base.is_blank() {
        return None;
    }
    let mut best: Option<Candidate> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if used[index] {
            continue;
        }
        if let Some(found) = qualify(index, base, candidate, thresholds, weights) {
            if best.as_ref().map_or(true, |b| found.better_than(b)) {
                best = Some(found);
            }
        }
    }
    best
}

/// Same result as `find_best_candidate`, with the read-only scan sharded
/// across the rayon pool.
pub fn find_best_candidate_parallel(
    base: &PreparedName,
    candidates: &[PreparedName],
    used: &[bool],
    thresholds: &Thresholds,
    weights: Weights,
) -> Option<Candidate> {
    if base.is_blank() {
        return None;
    }
    candidates
        .par_iter()
        .enumerate()
        .filter(|(index, _)| !used[*index])
        .filter_map(|(index, candidate)| qualify(index, base, candidate, thresholds, weights))
        .reduce_with(|a, b| if b.better_than(&a) { b } else { a })
}

// ============================================================================
// Assignment Engine
// ============================================================================

/// Owns the "already assigned" set for exactly one run.
#[derive(Debug)]
pub struct AssignmentEngine<'a> {
    candidates: &'a [PreparedName],
    used: Vec<bool>,
    thresholds: Thresholds,
    weights: Weights,
    parallel: bool,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(candidates: &'a [PreparedName], thresholds: Thresholds, weights: Weights) -> Self {
        Self {
            candidates,
            used: vec![false; candidates.len()],
            thresholds,
            weights,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Mark an incoming record as assigned. Returns false if it was already taken.
    pub fn claim(&mut self, index: usize) -> bool {
        match self.used.get_mut(index) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    /// Search for the best candidate and commit it. The commit is always
    /// serial, even when the search is sharded.
    pub fn assign(&mut self, base: &PreparedName) -> Option<Candidate> {
        let found = if self.parallel {
            find_best_candidate_parallel(base, self.candidates, &self.used, &self.thresholds, self.weights)
        } else {
            find_best_candidate(base, self.candidates, &self.used, &self.thresholds, self.weights)
        }?;
        let claimed = self.claim(found.index);
        debug_assert!(claimed, "search returned an already-used candidate");
        Some(found)
    }

    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|u| **u).count()
    }

    pub fn unused_count(&self) -> usize {
        self.used.len() - self.used_count()
    }
}

// ============================================================================
// TESTS
// ============================================================================
