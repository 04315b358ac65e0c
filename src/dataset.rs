//! Loading base and incoming collections from CSV or JSON.
//!
//! Parsing lives outside the engine; everything here ends in a plain
//! `Vec<TrackRecord>` that has been through `TrackRecord::sanitized`.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{CorrectionFlags, TrackRecord};

/// One CSV row. Column names follow the exports of the classification
/// pipeline; unknown columns are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(alias = "artist_name")]
    artist: String,
    #[serde(alias = "track", alias = "song", alias = "name")]
    title: String,
    #[serde(alias = "isrc")]
    code: Option<String>,
    energy: Option<String>,
    #[serde(alias = "category")]
    accessibility: Option<String>,
    #[serde(alias = "explicit_rating")]
    explicit: Option<String>,
    /// Single-column form: "house; deep house" or "house|deep house".
    subgenres: Option<String>,
    subgenre_1: Option<String>,
    subgenre_2: Option<String>,
    subgenre_3: Option<String>,
    /// Applies to every field group.
    user_corrected: Option<String>,
    energy_corrected: Option<String>,
    #[serde(alias = "category_corrected")]
    accessibility_corrected: Option<String>,
    explicit_corrected: Option<String>,
    subgenres_corrected: Option<String>,
}

fn parse_flag(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "1" | "yes" | "y" | "x"
        )
    })
}

impl From<CsvRow> for TrackRecord {
    fn from(row: CsvRow) -> Self {
        let all = parse_flag(&row.user_corrected);
        let corrections = CorrectionFlags {
            energy: all || parse_flag(&row.energy_corrected),
            accessibility: all || parse_flag(&row.accessibility_corrected),
            explicit: all || parse_flag(&row.explicit_corrected),
            subgenres: all || parse_flag(&row.subgenres_corrected),
        };

        let mut subgenres: Vec<String> = [row.subgenre_1, row.subgenre_2, row.subgenre_3]
            .into_iter()
            .flatten()
            .collect();
        if let Some(joined) = row.subgenres {
            subgenres.extend(joined.split([';', '|']).map(str::to_string));
        }

        TrackRecord {
            artist: row.artist,
            title: row.title,
            code: row.code,
            energy: row.energy,
            accessibility: row.accessibility,
            explicit: row.explicit,
            subgenres,
            corrections,
        }
        .sanitized()
    }
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<Vec<TrackRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        records.push(TrackRecord::from(row?));
    }
    Ok(records)
}

pub fn read_json_from<R: Read>(reader: R) -> Result<Vec<TrackRecord>> {
    let records: Vec<TrackRecord> = serde_json::from_reader(reader)?;
    Ok(records.into_iter().map(TrackRecord::sanitized).collect())
}

/// Read a collection, choosing the parser from the file extension.
pub fn read_records(path: &Path) -> Result<Vec<TrackRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let records = match extension.as_deref() {
        Some("csv") => read_csv_from(BufReader::new(File::open(path)?))?,
        Some("json") => read_json_from(BufReader::new(File::open(path)?))?,
        _ => return Err(Error::UnsupportedFormat(path.to_path_buf())),
    };
    let blank = records
        .iter()
        .filter(|r| r.artist.is_empty() && r.title.is_empty())
        .count();
    if blank > 0 {
        tracing::warn!(path = %path.display(), blank, "rows without artist or title can never fuzzy-match");
    }
    tracing::info!(path = %path.display(), rows = records.len(), "loaded dataset");
    Ok(records)
}
