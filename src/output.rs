//! Writing the merged dataset as CSV or SQLite.

use indicatif::ProgressBar;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::MergedRecord;
use crate::progress::{log_progress, LOG_INTERVAL};

const WRITE_BATCH_SIZE: usize = 10_000;

/// Flat output row: merged fields, four provenance columns, match columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub artist: String,
    pub title: String,
    pub code: Option<String>,
    pub energy: Option<String>,
    pub energy_source: &'static str,
    pub accessibility: Option<String>,
    pub accessibility_source: &'static str,
    pub explicit: Option<String>,
    pub explicit_source: &'static str,
    pub subgenre_1: Option<String>,
    pub subgenre_2: Option<String>,
    pub subgenre_3: Option<String>,
    pub subgenres_source: &'static str,
    pub match_type: &'static str,
    pub match_score: f64,
    pub artist_score: f64,
    pub title_score: f64,
    pub incoming_row: Option<usize>,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

impl From<&MergedRecord> for MergedRow {
    fn from(record: &MergedRecord) -> Self {
        let subgenres = record.subgenres.value.as_deref().unwrap_or(&[]);
        let subgenre = |i: usize| subgenres.get(i).cloned();
        let m = &record.match_result;
        Self {
            artist: record.artist.clone(),
            title: record.title.clone(),
            code: record.code.clone(),
            energy: record.energy.value.clone(),
            energy_source: record.energy.provenance.as_str(),
            accessibility: record.accessibility.value.clone(),
            accessibility_source: record.accessibility.provenance.as_str(),
            explicit: record.explicit.value.clone(),
            explicit_source: record.explicit.provenance.as_str(),
            subgenre_1: subgenre(0),
            subgenre_2: subgenre(1),
            subgenre_3: subgenre(2),
            subgenres_source: record.subgenres.provenance.as_str(),
            match_type: m.match_type.as_str(),
            match_score: round4(m.combined_score),
            artist_score: round4(m.artist_score),
            title_score: round4(m.title_score),
            incoming_row: m.incoming_index,
        }
    }
}

pub fn write_csv_to<W: std::io::Write>(writer: W, records: &[MergedRecord], progress: &ProgressBar) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    let total = records.len() as u64;
    for (i, record) in records.iter().enumerate() {
        wtr.serialize(MergedRow::from(record))?;
        progress.inc(1);
        log_progress("write", i as u64 + 1, total, LOG_INTERVAL);
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_sqlite(conn: &mut Connection, records: &[MergedRecord], progress: &ProgressBar) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;

        CREATE TABLE merged_tracks (
            base_row INTEGER PRIMARY KEY,
            artist TEXT NOT NULL,
            title TEXT NOT NULL,
            code TEXT,
            energy TEXT,
            energy_source TEXT NOT NULL,
            accessibility TEXT,
            accessibility_source TEXT NOT NULL,
            explicit TEXT,
            explicit_source TEXT NOT NULL,
            subgenre_1 TEXT,
            subgenre_2 TEXT,
            subgenre_3 TEXT,
            subgenres_source TEXT NOT NULL,
            match_type TEXT NOT NULL,
            match_score REAL NOT NULL,
            artist_score REAL NOT NULL,
            title_score REAL NOT NULL,
            incoming_row INTEGER
        );

        CREATE INDEX idx_merged_tracks_match_type ON merged_tracks(match_type);",
    )?;

    let total = records.len() as u64;
    let mut written = 0u64;
    for chunk in records.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO merged_tracks (
                    base_row, artist, title, code,
                    energy, energy_source, accessibility, accessibility_source,
                    explicit, explicit_source, subgenre_1, subgenre_2, subgenre_3, subgenres_source,
                    match_type, match_score, artist_score, title_score, incoming_row
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            )?;

            for record in chunk {
                let row = MergedRow::from(record);
                stmt.execute(params![
                    record.base_index as i64,
                    row.artist,
                    row.title,
                    row.code,
                    row.energy,
                    row.energy_source,
                    row.accessibility,
                    row.accessibility_source,
                    row.explicit,
                    row.explicit_source,
                    row.subgenre_1,
                    row.subgenre_2,
                    row.subgenre_3,
                    row.subgenres_source,
                    row.match_type,
                    row.match_score,
                    row.artist_score,
                    row.title_score,
                    row.incoming_row.map(|i| i as i64),
                ])?;
                progress.inc(1);
            }
        }
        tx.commit()?;
        written += chunk.len() as u64;
        log_progress("write", written, total, WRITE_BATCH_SIZE as u64);
    }
    Ok(())
}

/// Write the merged dataset, choosing the format from the file extension.
/// An existing SQLite output is replaced.
pub fn write_merged(path: &Path, records: &[MergedRecord], progress: &ProgressBar) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => write_csv_to(std::fs::File::create(path)?, records, progress),
        Some("sqlite3" | "sqlite" | "db") => {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            let mut conn = Connection::open(path)?;
            write_sqlite(&mut conn, records, progress)
        }
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}
