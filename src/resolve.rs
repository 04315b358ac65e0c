//! Field resolution with per-field provenance.
//!
//! One table decides, per field group, whether the base record's existing
//! value outranks a freshly produced incoming value. The same function then
//! applies the trust hierarchy uniformly to every group:
//!
//! 1. user-corrected base value
//! 2. base value, for groups the base owns
//! 3. incoming value
//! 4. base value, for groups where the base is only a fallback
//! 5. absent

use serde::Serialize;

use crate::identity::canonical_code;
use crate::models::{MatchResult, MergedRecord, Provenance, Resolved, TrackRecord, MAX_SUBGENRES};

/// How much the base record's uncorrected value is trusted for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseAuthority {
    /// The base alone owns this field; its value beats incoming.
    Owned,
    /// Incoming refreshes this field; the base value fills gaps.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Energy,
    Accessibility,
    Explicit,
    Subgenres,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::Energy,
        FieldGroup::Accessibility,
        FieldGroup::Explicit,
        FieldGroup::Subgenres,
    ];

    pub fn authority(self) -> BaseAuthority {
        match self {
            FieldGroup::Explicit => BaseAuthority::Owned,
            FieldGroup::Energy | FieldGroup::Accessibility | FieldGroup::Subgenres => {
                BaseAuthority::Fallback
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldGroup::Energy => "energy",
            FieldGroup::Accessibility => "accessibility",
            FieldGroup::Explicit => "explicit",
            FieldGroup::Subgenres => "subgenres",
        }
    }

    fn is_corrected(self, record: &TrackRecord) -> bool {
        let flags = &record.corrections;
        match self {
            FieldGroup::Energy => flags.energy,
            FieldGroup::Accessibility => flags.accessibility,
            FieldGroup::Explicit => flags.explicit,
            FieldGroup::Subgenres => flags.subgenres,
        }
    }

    /// Trimmed text value; a blank string counts as absent.
    fn text_value(self, record: &TrackRecord) -> Option<String> {
        let raw = match self {
            FieldGroup::Energy => record.energy.as_deref(),
            FieldGroup::Accessibility => record.accessibility.as_deref(),
            FieldGroup::Explicit => record.explicit.as_deref(),
            FieldGroup::Subgenres => None,
        }?;
        let value = raw.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Apply the trust hierarchy to one field.
///
/// A user-corrected flag always yields the base value, even when that value
/// is empty: the reviewer's verdict stands.
pub fn resolve_field<T: Clone>(
    corrected: bool,
    base: Option<&T>,
    incoming: Option<&T>,
    authority: BaseAuthority,
) -> Resolved<T> {
    let pick = |value: &T, provenance| Resolved {
        value: Some(value.clone()),
        provenance,
    };

    if corrected {
        return Resolved {
            value: base.cloned(),
            provenance: Provenance::UserCorrected,
        };
    }
    if authority == BaseAuthority::Owned {
        if let Some(value) = base {
            return pick(value, Provenance::Cache);
        }
    }
    if let Some(value) = incoming {
        return pick(value, Provenance::Incoming);
    }
    match base {
        Some(value) => pick(value, Provenance::Cache),
        None => Resolved::absent(),
    }
}

fn resolve_text(group: FieldGroup, base: &TrackRecord, incoming: Option<&TrackRecord>) -> Resolved<String> {
    let incoming_value = incoming.and_then(|r| group.text_value(r));
    resolve_field(
        group.is_corrected(base),
        group.text_value(base).as_ref(),
        incoming_value.as_ref(),
        group.authority(),
    )
}

/// Non-blank subgenre tags, capped at `MAX_SUBGENRES`; an empty list is absent.
fn subgenre_list(record: &TrackRecord) -> Option<Vec<String>> {
    let tags: Vec<String> = record
        .subgenres
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SUBGENRES)
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}

/// Build the merged record for one base record and its optional match.
/// Never fails: missing inputs degrade to absent values.
pub fn resolve_record(
    base_index: usize,
    base: &TrackRecord,
    incoming: Option<&TrackRecord>,
    match_result: MatchResult,
) -> MergedRecord {
    let group = FieldGroup::Subgenres;
    let subgenres = resolve_field(
        group.is_corrected(base),
        subgenre_list(base).as_ref(),
        incoming.and_then(subgenre_list).as_ref(),
        group.authority(),
    );

    // Keep the base code; adopt the matched record's code only when the base has none.
    let code = canonical_code(base.code.as_deref())
        .and(base.code.clone())
        .or_else(|| {
            incoming.and_then(|r| canonical_code(r.code.as_deref()).and(r.code.clone()))
        });

    MergedRecord {
        base_index,
        artist: base.artist.clone(),
        title: base.title.clone(),
        code,
        energy: resolve_text(FieldGroup::Energy, base, incoming),
        accessibility: resolve_text(FieldGroup::Accessibility, base, incoming),
        explicit: resolve_text(FieldGroup::Explicit, base, incoming),
        subgenres,
        match_result,
    }
}

impl MergedRecord {
    pub fn provenance(&self, group: FieldGroup) -> Provenance {
        match group {
            FieldGroup::Energy => self.energy.provenance,
            FieldGroup::Accessibility => self.accessibility.provenance,
            FieldGroup::Explicit => self.explicit.provenance,
            FieldGroup::Subgenres => self.subgenres.provenance,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CorrectionFlags;
    use crate::scoring::SimilarityScores;

    #[test]
    fn test_resolve_field_priority_order() {
        let base = "base".to_string();
        let new = "new".to_string();

        let r = resolve_field(true, Some(&base), Some(&new), BaseAuthority::Fallback);
        assert_eq!((r.value.as_deref(), r.provenance), (Some("base"), Provenance::UserCorrected));

        let r = resolve_field(false, Some(&base), Some(&new), BaseAuthority::Owned);
        assert_eq!((r.value.as_deref(), r.provenance), (Some("base"), Provenance::Cache));

        let r = resolve_field(false, Some(&base), Some(&new), BaseAuthority::Fallback);
        assert_eq!((r.value.as_deref(), r.provenance), (Some("new"), Provenance::Incoming));

        let r = resolve_field(false, Some(&base), None, BaseAuthority::Fallback);
        assert_eq!((r.value.as_deref(), r.provenance), (Some("base"), Provenance::Cache));

        let r = resolve_field(false, None, Some(&new), BaseAuthority::Owned);
        assert_eq!((r.value.as_deref(), r.provenance), (Some("new"), Provenance::Incoming));

        let r: Resolved<String> = resolve_field(false, None, None, BaseAuthority::Owned);
        assert_eq!(r, Resolved::absent());
    }

    #[test]
    fn test_corrected_empty_value_stays_empty() {
        let new = "new".to_string();
        let r = resolve_field(true, None, Some(&new), BaseAuthority::Fallback);
        assert_eq!(r.value, None);
        assert_eq!(r.provenance, Provenance::UserCorrected);
    }

    #[test]
    fn test_explicit_rating_kept_from_base() {
        let base = TrackRecord::new("Bob Marley", "Could You Be Loved").with_explicit("Explicit");
        let incoming = TrackRecord::new("Bob Marley", "Could You Be Loved").with_explicit("Suggestive");
        let merged = resolve_record(0, &base, Some(&incoming), MatchResult::exact(0, SimilarityScores::default()));
        assert_eq!(merged.explicit.value.as_deref(), Some("Explicit"));
        assert_eq!(merged.explicit.provenance, Provenance::Cache);
    }

    #[test]
    fn test_user_corrected_accessibility_wins() {
        let base = TrackRecord::new("A", "T")
            .with_accessibility("Timeless")
            .with_energy("Low")
            .with_corrections(CorrectionFlags {
                accessibility: true,
                ..CorrectionFlags::default()
            });
        let incoming = TrackRecord::new("A", "T")
            .with_accessibility("Commercial")
            .with_energy("High")
            .with_explicit("Clean");
        let merged = resolve_record(0, &base, Some(&incoming), MatchResult::exact(0, SimilarityScores::default()));
        assert_eq!(merged.accessibility.value.as_deref(), Some("Timeless"));
        assert_eq!(merged.accessibility.provenance, Provenance::UserCorrected);
        // Groups resolve independently.
        assert_eq!(merged.energy.value.as_deref(), Some("High"));
        assert_eq!(merged.energy.provenance, Provenance::Incoming);
        assert_eq!(merged.explicit.provenance, Provenance::Incoming);
    }

    #[test]
    fn test_unmatched_record_keeps_base_values() {
        let base = TrackRecord::new("A", "T")
            .with_energy("Medium")
            .with_subgenres(["indie rock"]);
        let merged = resolve_record(4, &base, None, MatchResult::unmatched());
        assert_eq!(merged.base_index, 4);
        assert_eq!(merged.energy.provenance, Provenance::Cache);
        assert_eq!(merged.subgenres.value, Some(vec!["indie rock".to_string()]));
        assert_eq!(merged.accessibility, Resolved::absent());
        assert_eq!(merged.explicit, Resolved::absent());
    }

    #[test]
    fn test_subgenres_resolve_as_a_group() {
        let base = TrackRecord::new("A", "T");
        let incoming = TrackRecord::new("A", "T").with_subgenres(["house", "deep house"]);
        let merged = resolve_record(0, &base, Some(&incoming), MatchResult::exact(0, SimilarityScores::default()));
        assert_eq!(merged.subgenres.provenance, Provenance::Incoming);
        assert_eq!(merged.provenance(FieldGroup::Subgenres), Provenance::Incoming);
    }

    #[test]
    fn test_code_adopted_from_match_when_base_has_none() {
        let base = TrackRecord::new("A", "T").with_code("null");
        let incoming = TrackRecord::new("A", "T").with_code("USRC17607839");
        let merged = resolve_record(0, &base, Some(&incoming), MatchResult::unmatched());
        assert_eq!(merged.code.as_deref(), Some("USRC17607839"));

        let base = TrackRecord::new("A", "T").with_code("GBAYE0601498");
        let merged = resolve_record(0, &base, Some(&incoming), MatchResult::unmatched());
        assert_eq!(merged.code.as_deref(), Some("GBAYE0601498"));
    }
}
