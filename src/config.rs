//! Run configuration: threshold profiles, scoring weights and report knobs.
//!
//! A `MergeConfig` is built once per run (defaults, then an optional JSON
//! file, then CLI overrides) and validated before any matching starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, Error, Result};
use crate::scoring::Weights;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ARTIST_WEIGHT: f64 = 0.4;
pub const DEFAULT_TITLE_WEIGHT: f64 = 0.6;

/// Matches scoring below `combined_threshold + margin` are flagged for review.
pub const DEFAULT_LOW_CONFIDENCE_MARGIN: f64 = 0.05;

/// Cap on the number of sample pairs kept in each report section.
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Slack when comparing a score against a threshold. A weighted sum such as
/// `0.4 * 0.9 + 0.6 * 14/15` lands a hair below 0.92 in f64; a pair sitting
/// exactly on a threshold counts as reaching it.
pub const THRESHOLD_EPSILON: f64 = 1e-9;

// ============================================================================
// Threshold Profiles
// ============================================================================

/// Minimum scores a fuzzy candidate must reach on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub artist: f64,
    pub title: f64,
    pub combined: f64,
}

impl Thresholds {
    /// All three thresholds must hold at once; partial satisfaction is not a match.
    /// Each comparison allows `THRESHOLD_EPSILON` of float rounding.
    pub fn accepts(&self, artist_score: f64, title_score: f64, combined_score: f64) -> bool {
        let reaches = |score: f64, threshold: f64| score + THRESHOLD_EPSILON >= threshold;
        reaches(artist_score, self.artist)
            && reaches(title_score, self.title)
            && reaches(combined_score, self.combined)
    }
}

/// Built-in threshold profile, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchProfile {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl MatchProfile {
    pub const ALL: [MatchProfile; 3] = [
        MatchProfile::Conservative,
        MatchProfile::Balanced,
        MatchProfile::Aggressive,
    ];

    pub fn thresholds(self) -> Thresholds {
        match self {
            MatchProfile::Conservative => Thresholds {
                artist: 0.90,
                title: 0.90,
                combined: 0.92,
            },
            MatchProfile::Balanced => Thresholds {
                artist: 0.85,
                title: 0.85,
                combined: 0.87,
            },
            MatchProfile::Aggressive => Thresholds {
                artist: 0.75,
                title: 0.80,
                combined: 0.80,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MatchProfile::Conservative => "conservative",
            MatchProfile::Balanced => "balanced",
            MatchProfile::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for MatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(MatchProfile::Conservative),
            "balanced" => Ok(MatchProfile::Balanced),
            "aggressive" => Ok(MatchProfile::Aggressive),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

// ============================================================================
// Merge Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub profile: MatchProfile,
    pub artist_weight: f64,
    pub title_weight: f64,
    /// Replaces the profile's combined threshold when set.
    pub combined_threshold: Option<f64>,
    pub low_confidence_margin: f64,
    pub sample_limit: usize,
    /// Shard the fuzzy candidate scan across the rayon pool.
    pub parallel: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            profile: MatchProfile::default(),
            artist_weight: DEFAULT_ARTIST_WEIGHT,
            title_weight: DEFAULT_TITLE_WEIGHT,
            combined_threshold: None,
            low_confidence_margin: DEFAULT_LOW_CONFIDENCE_MARGIN,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            parallel: false,
        }
    }
}

impl MergeConfig {
    pub fn with_profile(profile: MatchProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing keys keep their defaults; unknown keys
    /// and unknown profile names are rejected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: MergeConfig =
            serde_json::from_str(&text).map_err(|e| Error::Config(ConfigError::Parse(e.to_string())))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let (a, t) = (self.artist_weight, self.title_weight);
        if !a.is_finite() || !t.is_finite() || a < 0.0 || t < 0.0 || (a + t - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights { artist: a, title: t });
        }
        if let Some(value) = self.combined_threshold {
            check_unit_range("combined_threshold", value)?;
        }
        check_unit_range("low_confidence_margin", self.low_confidence_margin)?;
        Ok(())
    }

    /// Profile thresholds with the combined override applied.
    pub fn thresholds(&self) -> Thresholds {
        let mut thresholds = self.profile.thresholds();
        if let Some(combined) = self.combined_threshold {
            thresholds.combined = combined;
        }
        thresholds
    }

    pub fn weights(&self) -> Weights {
        Weights {
            artist: self.artist_weight,
            title: self.title_weight,
        }
    }
}

fn check_unit_range(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_profile_thresholds() {
        assert_eq!(
            MatchProfile::Balanced.thresholds(),
            Thresholds { artist: 0.85, title: 0.85, combined: 0.87 }
        );
        assert_eq!(MatchProfile::Aggressive.thresholds().artist, 0.75);
        assert_eq!(MatchProfile::Conservative.thresholds().combined, 0.92);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("Aggressive".parse::<MatchProfile>(), Ok(MatchProfile::Aggressive));
        assert_eq!(" balanced ".parse::<MatchProfile>(), Ok(MatchProfile::Balanced));
        assert_eq!(
            "reckless".parse::<MatchProfile>(),
            Err(ConfigError::UnknownProfile("reckless".to_string()))
        );
    }

    #[test]
    fn test_accepts_requires_all_three() {
        let t = MatchProfile::Balanced.thresholds();
        assert!(t.accepts(0.85, 0.85, 0.87));
        assert!(!t.accepts(0.84, 1.0, 0.99));
        assert!(!t.accepts(1.0, 0.84, 0.99));
        assert!(!t.accepts(0.9, 0.9, 0.86));
    }

    #[test]
    fn test_accepts_score_on_the_boundary() {
        let t = MatchProfile::Conservative.thresholds();
        let combined = 0.4 * 0.9 + 0.6 * (14.0 / 15.0);
        assert!(combined < 0.92);
        assert!(t.accepts(0.9, 14.0 / 15.0, combined));
        assert!(!t.accepts(0.9, 14.0 / 15.0, 0.9199));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(MergeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = MergeConfig {
            artist_weight: 0.5,
            title_weight: 0.6,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeights { .. })));

        let config = MergeConfig {
            artist_weight: 0.3,
            title_weight: 0.7,
            ..MergeConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = MergeConfig {
            artist_weight: -0.5,
            title_weight: 1.5,
            ..MergeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_combined_override() {
        let config = MergeConfig {
            combined_threshold: Some(0.95),
            ..MergeConfig::default()
        };
        let t = config.thresholds();
        assert_eq!(t.combined, 0.95);
        assert_eq!(t.artist, 0.85);

        let config = MergeConfig {
            combined_threshold: Some(1.5),
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { name: "combined_threshold", .. })));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"profile": "aggressive", "sample_limit": 5}}"#).unwrap();
        let config = MergeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.profile, MatchProfile::Aggressive);
        assert_eq!(config.sample_limit, 5);
        assert_eq!(config.artist_weight, DEFAULT_ARTIST_WEIGHT);
    }

    #[test]
    fn test_from_file_rejects_unknown_profile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"profile": "loose"}}"#).unwrap();
        let err = MergeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
