use std::collections::HashSet;
use std::fs;

use indicatif::ProgressBar;
use rusqlite::Connection;
use tempfile::TempDir;

use track_reconcile::dataset::read_records;
use track_reconcile::output::write_merged;
use track_reconcile::scoring::{combined_score, string_similarity, Weights};
use track_reconcile::{
    reconcile, CorrectionFlags, MatchProfile, MatchType, MergeConfig, Provenance, TrackRecord,
};

fn balanced() -> MergeConfig {
    MergeConfig::with_profile(MatchProfile::Balanced)
}

// ============================================================================
// Worked scenarios
// ============================================================================

#[test]
fn cached_explicit_rating_beats_incoming() {
    let base = vec![TrackRecord::new("Bob Marley", "Could You Be Loved").with_explicit("Explicit")];
    let incoming = vec![TrackRecord::new("Bob Marley", "Could You Be Loved").with_explicit("Suggestive")];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let merged = &result.merged[0];
    assert_eq!(merged.match_result.match_type, MatchType::Fuzzy);
    assert_eq!(merged.match_result.combined_score, 1.0);
    assert_eq!(merged.explicit.value.as_deref(), Some("Explicit"));
    assert_eq!(merged.explicit.provenance, Provenance::Cache);
    assert_eq!(result.report.preservation.explicit_cache, 1);
}

#[test]
fn featured_artist_variants_match_under_balanced() {
    let base = vec![TrackRecord::new("Ed Sheeran & Justin Bieber", "I Don't Care (with Justin Bieber)")];
    let incoming = vec![TrackRecord::new("Ed Sheeran, Justin Bieber", "I Don't Care")];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let m = &result.merged[0].match_result;
    assert_eq!(m.match_type, MatchType::Fuzzy);
    assert!(m.artist_score >= 0.85);
    assert!(m.title_score >= 0.85);
    assert!(m.combined_score >= 0.87);
}

#[test]
fn perfect_title_cannot_rescue_wrong_artist() {
    let base = vec![TrackRecord::new("The Beatles", "Yesterday")];
    let incoming = vec![TrackRecord::new("The Byrds", "Yesterday")];

    for profile in MatchProfile::ALL {
        let result = reconcile(&base, &incoming, MergeConfig::with_profile(profile)).unwrap();
        assert_eq!(result.merged[0].match_result.match_type, MatchType::Unmatched, "{profile}");
        assert_eq!(result.merged[0].match_result.incoming_index, None);
    }
    let scores = combined_score(&base[0], &incoming[0], Weights::default());
    assert!(scores.artist_score < 0.75);
    assert_eq!(scores.title_score, 1.0);
}

#[test]
fn user_corrected_accessibility_survives() {
    let base = vec![TrackRecord::new("Nina Simone", "Feeling Good")
        .with_accessibility("Timeless")
        .with_corrections(CorrectionFlags {
            accessibility: true,
            ..CorrectionFlags::default()
        })];
    let incoming = vec![TrackRecord::new("Nina Simone", "Feeling Good")
        .with_accessibility("Commercial")
        .with_energy("Medium")];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let merged = &result.merged[0];
    assert_eq!(merged.accessibility.value.as_deref(), Some("Timeless"));
    assert_eq!(merged.accessibility.provenance, Provenance::UserCorrected);
    assert_eq!(merged.energy.value.as_deref(), Some("Medium"));
    assert_eq!(merged.energy.provenance, Provenance::Incoming);
    assert_eq!(result.report.preservation.energy_category_user_corrected, 1);
}

#[test]
fn large_base_small_incoming_summary() {
    let mut base: Vec<TrackRecord> = (0..13_427)
        .map(|i| TrackRecord::new(format!("Filler Artist {i}"), format!("Filler Song {i}")))
        .collect();
    base[0] = TrackRecord::new("Adele", "Hello").with_code("GBBKS1500214");
    base[1] = TrackRecord::new("Daft Punk", "One More Time");
    base[2] = TrackRecord::new("Massive Attack", "Teardrop");
    base[3] = TrackRecord::new("Portishead", "Glory Box");

    let incoming = vec![
        TrackRecord::new("Adele", "Hello").with_code("GBBKS1500214"),
        TrackRecord::new("Daft Punk", "One More Time"),
        TrackRecord::new("Massive Attack", "Teardrop"),
        TrackRecord::new("Portishead", "Glory Box"),
        TrackRecord::new("Zzyzx Quartet", "Nonesuch Lullaby"),
    ];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let summary = &result.report.summary;
    assert_eq!(summary.exact, 1);
    assert_eq!(summary.fuzzy, 3);
    assert_eq!(summary.unmatched_base, 13_423);
    assert_eq!(summary.unmatched_incoming, 1);
    assert_eq!(result.merged.len(), 13_427);

    let dist = result.report.fuzzy_scores.as_ref().unwrap();
    assert_eq!(dist.min, 1.0);
    assert_eq!(dist.median, 1.0);

    let json: serde_json::Value = serde_json::from_str(&result.report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["isrc_exact"], 1);
    assert_eq!(json["summary"]["unmatched_cache"], 13_423);
    assert_eq!(json["summary"]["unmatched_enriched"], 1);
}

#[test]
fn blank_incoming_values_never_replace_base_values() {
    // Records built in code skip the dataset readers' cleanup.
    let base = vec![TrackRecord {
        subgenres: vec!["soul".to_string()],
        ..TrackRecord::new("Aretha Franklin", "Respect").with_energy("Low")
    }];
    let incoming = vec![TrackRecord {
        energy: Some("   ".to_string()),
        accessibility: Some(String::new()),
        subgenres: ["", "a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
        ..TrackRecord::new("Aretha Franklin", "Respect")
    }];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let merged = &result.merged[0];
    assert_eq!(merged.match_result.match_type, MatchType::Fuzzy);
    assert_eq!(merged.energy.value.as_deref(), Some("Low"));
    assert_eq!(merged.energy.provenance, Provenance::Cache);
    assert_eq!(merged.accessibility.value, None);
    assert_eq!(merged.accessibility.provenance, Provenance::Absent);
    assert_eq!(
        merged.subgenres.value,
        Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
    assert_eq!(merged.subgenres.provenance, Provenance::Incoming);
}

#[test]
fn blank_incoming_subgenres_fall_back_to_base() {
    let base = vec![TrackRecord::new("Aretha Franklin", "Respect").with_subgenres(["soul"])];
    let incoming = vec![TrackRecord {
        subgenres: vec![" ".to_string(), String::new()],
        ..TrackRecord::new("Aretha Franklin", "Respect")
    }];

    let result = reconcile(&base, &incoming, balanced()).unwrap();
    let merged = &result.merged[0];
    assert_eq!(merged.subgenres.value, Some(vec!["soul".to_string()]));
    assert_eq!(merged.subgenres.provenance, Provenance::Cache);
}

#[test]
fn lyric_with_bracket_is_part_of_the_title() {
    let base = vec![TrackRecord::new("Sam Smith", "Stay (With Me)")];
    let incoming = vec![TrackRecord::new("Sam Smith", "Stay")];
    let result = reconcile(&base, &incoming, MergeConfig::with_profile(MatchProfile::Aggressive)).unwrap();
    assert_eq!(result.merged[0].match_result.match_type, MatchType::Unmatched);
}

#[test]
fn pair_exactly_on_the_conservative_boundary_matches() {
    // artist 1 - 1/10 = 0.9, title 1 - 1/15; the weighted sum rounds below 0.92
    let base = vec![TrackRecord::new("Stereolabs", "Cybele's Reverie")];
    let incoming = vec![TrackRecord::new("Stereolabz", "Cybele's Reveria")];
    let result = reconcile(&base, &incoming, MergeConfig::with_profile(MatchProfile::Conservative)).unwrap();
    let m = &result.merged[0].match_result;
    assert_eq!(m.match_type, MatchType::Fuzzy);
    assert!(m.combined_score < 0.92);
}

// ============================================================================
// Properties
// ============================================================================

const NAMES: [&str; 8] = [
    "Beyoncé",
    "Beyonce",
    "Sigur Rós",
    "AC/DC",
    "Guns N' Roses",
    "Guns N Roses",
    "Motörhead",
    "",
];

#[test]
fn similarity_is_symmetric_bounded_and_reflexive() {
    for a in NAMES {
        for b in NAMES {
            let ab = string_similarity(a, b);
            assert_eq!(ab, string_similarity(b, a), "{a:?} vs {b:?}");
            assert!((0.0..=1.0).contains(&ab), "{a:?} vs {b:?} = {ab}");
        }
        if !a.is_empty() {
            assert_eq!(string_similarity(a, a), 1.0);
        }
    }
}

#[test]
fn combined_scores_stay_bounded_for_uneven_weights() {
    let config = MergeConfig {
        artist_weight: 0.3,
        title_weight: 0.7,
        ..MergeConfig::default()
    };
    config.validate().unwrap();
    for a in NAMES {
        for b in NAMES {
            let s = combined_score(&TrackRecord::new(a, a), &TrackRecord::new(b, b), config.weights());
            assert!((0.0..=1.0).contains(&s.combined_score));
        }
    }
}

fn graded_pairs() -> (Vec<TrackRecord>, Vec<TrackRecord>) {
    let base = vec![
        TrackRecord::new("Adele", "Hello"),
        TrackRecord::new("Coldplay", "Yellow"),
        TrackRecord::new("Radiohead", "Creep"),
    ];
    let incoming = vec![
        TrackRecord::new("Radiohed", "Creep"),
        TrackRecord::new("Coldplay", "Yelow"),
        TrackRecord::new("Adele", "Hello"),
    ];
    (base, incoming)
}

#[test]
fn looser_profiles_never_match_fewer() {
    let (base, incoming) = graded_pairs();
    let fuzzy = |profile| {
        reconcile(&base, &incoming, MergeConfig::with_profile(profile))
            .unwrap()
            .report
            .summary
            .fuzzy
    };
    let conservative = fuzzy(MatchProfile::Conservative);
    let balanced = fuzzy(MatchProfile::Balanced);
    let aggressive = fuzzy(MatchProfile::Aggressive);
    assert!(aggressive >= balanced && balanced >= conservative);
    assert_eq!((conservative, balanced, aggressive), (1, 2, 3));
}

#[test]
fn no_incoming_record_is_assigned_twice() {
    let base = vec![
        TrackRecord::new("Daft Punk", "Digital Love"),
        TrackRecord::new("Daft Punk", "Digital Love"),
        TrackRecord::new("Daft Punk", "Digital Love (Remastered 2021)"),
        TrackRecord::new("Daft Punk", "Digital Love").with_code("GBDUW0000059"),
    ];
    let incoming = vec![
        TrackRecord::new("Daft Punk", "Digital Love").with_code("GB-DUW-00-00059"),
        TrackRecord::new("Daft Punk", "Digital Love"),
    ];

    for profile in MatchProfile::ALL {
        let result = reconcile(&base, &incoming, MergeConfig::with_profile(profile)).unwrap();
        let claimed: Vec<usize> = result
            .merged
            .iter()
            .filter_map(|m| m.match_result.incoming_index)
            .collect();
        let unique: HashSet<usize> = claimed.iter().copied().collect();
        assert_eq!(claimed.len(), unique.len());
        assert_eq!(result.merged[3].match_result.match_type, MatchType::Exact);
        assert_eq!(result.merged[3].match_result.combined_score, 1.0);
        assert_eq!(result.merged[0].match_result.incoming_index, Some(1));
        assert_eq!(result.merged[1].match_result.match_type, MatchType::Unmatched);
    }
}

#[test]
fn null_sentinel_codes_never_match_each_other() {
    let base = vec![
        TrackRecord::new("Artist One", "First Song").with_code("NULL"),
        TrackRecord::new("Artist Two", "Second Song").with_code(""),
    ];
    let incoming = vec![
        TrackRecord::new("Somebody Else", "Unrelated").with_code("null"),
        TrackRecord::new("Another Person", "Different").with_code("n/a"),
    ];
    let result = reconcile(&base, &incoming, balanced()).unwrap();
    assert_eq!(result.report.summary.exact, 0);
    assert_eq!(result.report.summary.unmatched_base, 2);
}

#[test]
fn user_corrections_hold_regardless_of_incoming() {
    let incoming_values = [None, Some("Low"), Some("High")];
    for incoming_energy in incoming_values {
        let base = vec![TrackRecord::new("Björk", "Jóga")
            .with_energy("Medium")
            .with_explicit("Clean")
            .with_subgenres(["art pop"])
            .with_corrections(CorrectionFlags::all())];
        let mut candidate = TrackRecord::new("Bjork", "Joga")
            .with_explicit("Explicit")
            .with_subgenres(["electronica", "trip hop"]);
        candidate.energy = incoming_energy.map(str::to_string);

        let result = reconcile(&base, &[candidate], balanced()).unwrap();
        let merged = &result.merged[0];
        assert_eq!(merged.match_result.match_type, MatchType::Fuzzy);
        assert_eq!(merged.energy.value.as_deref(), Some("Medium"));
        assert_eq!(merged.energy.provenance, Provenance::UserCorrected);
        assert_eq!(merged.explicit.value.as_deref(), Some("Clean"));
        assert_eq!(merged.explicit.provenance, Provenance::UserCorrected);
        assert_eq!(merged.subgenres.value.as_deref(), Some(&["art pop".to_string()][..]));
        assert_eq!(merged.subgenres.provenance, Provenance::UserCorrected);
    }
}

#[test]
fn output_has_one_row_per_base_record() {
    let (mut base, incoming) = graded_pairs();
    base.push(TrackRecord::new("", ""));
    base.push(TrackRecord::new("Adele", "Hello"));

    for profile in MatchProfile::ALL {
        let result = reconcile(&base, &incoming, MergeConfig::with_profile(profile)).unwrap();
        assert_eq!(result.merged.len(), base.len());
        for (row, merged) in result.merged.iter().enumerate() {
            assert_eq!(merged.base_index, row);
            assert_eq!(merged.artist, base[row].artist);
        }
        let s = &result.report.summary;
        assert_eq!(s.exact + s.fuzzy + s.unmatched_base, base.len());
    }
}

#[test]
fn invalid_configuration_fails_fast() {
    assert!("strict".parse::<MatchProfile>().is_err());
    let bad = MergeConfig {
        artist_weight: 0.5,
        title_weight: 0.6,
        ..MergeConfig::default()
    };
    assert!(reconcile(&[], &[], bad).is_err());
}

#[test]
fn combined_threshold_override_tightens_profile() {
    let (base, incoming) = graded_pairs();
    let config = MergeConfig {
        combined_threshold: Some(0.99),
        ..MergeConfig::with_profile(MatchProfile::Aggressive)
    };
    let result = reconcile(&base, &incoming, config).unwrap();
    assert_eq!(result.report.summary.fuzzy, 1);
    assert_eq!(result.report.profile.thresholds.combined, 0.99);
}

// ============================================================================
// File round trip
// ============================================================================

#[test]
fn csv_in_csv_sqlite_and_report_out() {
    let dir = TempDir::new().unwrap();
    let base_path = dir.path().join("base.csv");
    let incoming_path = dir.path().join("incoming.json");
    fs::write(
        &base_path,
        "artist,title,isrc,energy,category,explicit,user_corrected\n\
         Adele,Hello,GBBKS1500214,,,,\n\
         Bob Marley,Could You Be Loved,null,,Timeless,Explicit,true\n\
         Nobody,Nothing,,Low,,,\n",
    )
    .unwrap();
    fs::write(
        &incoming_path,
        r#"[
            {"artist": "Adele", "title": "Hello", "isrc": "gbbks1500214", "energy": "Medium"},
            {"artist": "Bob Marley", "title": "Could You Be Loved", "energy": "High",
             "accessibility": "Commercial", "explicit": "Suggestive"}
        ]"#,
    )
    .unwrap();

    let base = read_records(&base_path).unwrap();
    let incoming = read_records(&incoming_path).unwrap();
    let result = reconcile(&base, &incoming, balanced()).unwrap();
    assert_eq!(result.report.summary.exact, 1);
    assert_eq!(result.report.summary.fuzzy, 1);

    let csv_path = dir.path().join("merged.csv");
    write_merged(&csv_path, &result.merged, &ProgressBar::hidden()).unwrap();
    let text = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("Bob Marley,Could You Be Loved,,,user_corrected,Timeless,user_corrected,Explicit,user_corrected"));

    let db_path = dir.path().join("merged.sqlite3");
    write_merged(&db_path, &result.merged, &ProgressBar::hidden()).unwrap();
    let conn = Connection::open(&db_path).unwrap();
    let (energy, source): (String, String) = conn
        .query_row(
            "SELECT energy, energy_source FROM merged_tracks WHERE base_row = 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((energy.as_str(), source.as_str()), ("Medium", "incoming"));
    let unmatched: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM merged_tracks WHERE match_type = 'none'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unmatched, 1);

    let report_path = dir.path().join("merged.report.json");
    result.report.write_to_file(&report_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["isrc_exact"], 1);
    assert_eq!(json["profile"]["name"], "balanced");
}
