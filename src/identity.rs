//! Exact identity matching by unique recording code.

use rustc_hash::FxHashMap;

use crate::models::TrackRecord;

/// Placeholder values exporters write where a code is missing.
/// Treating these as codes would make every code-less record collide.
const NULL_SENTINELS: &[&str] = &["null", "none", "nan", "n/a", "na", "nil", "undefined", "-"];

/// Canonical form of a unique code, or `None` when the code is blank or a
/// null sentinel. Whitespace and hyphens are dropped and letters uppercased,
/// so "us-rc1-76-07839" and "USRC17607839" collide.
pub fn canonical_code(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || NULL_SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s)) {
        return None;
    }
    let code: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Index mapping canonical code to position in the incoming collection.
#[derive(Debug, Default)]
pub struct CodeIndex {
    by_code: FxHashMap<String, usize>,
    duplicates: usize,
}

impl CodeIndex {
    /// The first incoming record carrying a code owns it; later duplicates
    /// stay reachable only through fuzzy matching.
    pub fn build(incoming: &[TrackRecord]) -> Self {
        let mut by_code = FxHashMap::default();
        let mut duplicates = 0;
        for (idx, record) in incoming.iter().enumerate() {
            let Some(code) = canonical_code(record.code.as_deref()) else {
                continue;
            };
            if by_code.contains_key(&code) {
                duplicates += 1;
                tracing::debug!(code = %code, row = idx, "duplicate incoming code ignored");
            } else {
                by_code.insert(code, idx);
            }
        }
        Self { by_code, duplicates }
    }

    pub fn lookup(&self, code: Option<&str>) -> Option<usize> {
        canonical_code(code).and_then(|c| self.by_code.get(&c).copied())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Incoming records whose code was already owned by an earlier record.
    pub fn duplicate_codes(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code(Some(" usrc17607839 ")), Some("USRC17607839".to_string()));
        assert_eq!(canonical_code(Some("US-RC1-76-07839")), Some("USRC17607839".to_string()));
        assert_eq!(canonical_code(Some("")), None);
        assert_eq!(canonical_code(Some("NULL")), None);
        assert_eq!(canonical_code(Some("N/A")), None);
        assert_eq!(canonical_code(Some(" - ")), None);
        assert_eq!(canonical_code(None), None);
    }

    #[test]
    fn test_sentinel_codes_never_collide() {
        let incoming = vec![
            TrackRecord::new("A", "One").with_code("null"),
            TrackRecord::new("B", "Two").with_code(""),
            TrackRecord::new("C", "Three"),
        ];
        let index = CodeIndex::build(&incoming);
        assert!(index.is_empty());
        assert_eq!(index.lookup(Some("null")), None);
        assert_eq!(index.lookup(Some("")), None);
        assert_eq!(index.lookup(None), None);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let incoming = vec![
            TrackRecord::new("A", "One").with_code("GBAYE0601498"),
            TrackRecord::new("A", "One (Remix)").with_code("gbaye0601498"),
            TrackRecord::new("B", "Two").with_code("USUM71703861"),
        ];
        let index = CodeIndex::build(&incoming);
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicate_codes(), 1);
        assert_eq!(index.lookup(Some("GBAYE0601498")), Some(0));
        assert_eq!(index.lookup(Some("usum71703861")), Some(2));
        assert_eq!(index.lookup(Some("XX0000000000")), None);
    }
}
