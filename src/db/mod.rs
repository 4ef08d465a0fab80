pub mod import;
pub mod schema;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::core::reading::{CaseRecord, parse_date};
use crate::core::{RiskLevel, RiskVerdict};
use import::CsvTable;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error in {source_name}: {message}")]
    Csv { source_name: String, message: String },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of historical case counts for a location.
pub trait CaseHistoryStore {
    /// Records for the location, in insertion order (not necessarily sorted).
    fn case_history(&self, location: &str) -> Result<Vec<CaseRecord>, StoreError>;
}

/// A persisted assessment from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: i64,
    pub engine: String,
    pub subject: String,
    pub risk_level: RiskLevel,
    pub label: String,
    pub score: f64,
    pub low_confidence: bool,
    pub verdict_json: String,
    pub created_at: String,
}

impl AssessmentRecord {
    pub fn verdict(&self) -> Result<RiskVerdict, StoreError> {
        Ok(serde_json::from_str(&self.verdict_json)?)
    }
}

pub struct Database {
    conn: Connection,
}

/// Thread-safe wrapper around Database.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
        })
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        // A panic while holding the lock cannot leave SQLite half-written
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a single case record.
    pub fn insert_case(&self, location: &str, state: &str, record: &CaseRecord) -> Result<(), StoreError> {
        self.db().insert_case(location, state, record)
    }

    /// Insert many records for one location in a single transaction.
    pub fn insert_cases_batch(&self, location: &str, state: &str, records: &[CaseRecord]) -> Result<(), StoreError> {
        self.db().insert_cases_batch(location, state, records)
    }

    /// Bulk-load case counts from a `location,state,cases,date` CSV.
    pub fn load_cases_from_csv(&self, path: &Path) -> Result<usize, StoreError> {
        let table = CsvTable::read(path)?;
        self.db().load_cases(&table)
    }

    /// Total number of stored case records.
    pub fn case_record_count(&self) -> Result<usize, StoreError> {
        self.db().case_record_count()
    }

    /// Append a verdict to the assessment log.
    pub fn record_assessment(&self, subject: &str, verdict: &RiskVerdict) -> Result<(), StoreError> {
        self.db().record_assessment(subject, verdict)
    }

    /// Most recent assessments first.
    pub fn recent_assessments(&self, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        self.db().recent_assessments(limit)
    }

    /// Assessments rated at `level` or worse, most severe first.
    pub fn assessments_at_or_above(&self, level: RiskLevel, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        self.db().assessments_at_or_above(level, limit)
    }

    pub fn assessment_count(&self) -> Result<usize, StoreError> {
        self.db().assessment_count()
    }
}

impl CaseHistoryStore for SharedDatabase {
    fn case_history(&self, location: &str) -> Result<Vec<CaseRecord>, StoreError> {
        self.db().case_history(location)
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_case(&self, location: &str, state: &str, record: &CaseRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO case_records (location, state, date, cases) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![location, state, date_text(record), record.case_count],
        )?;
        Ok(())
    }

    pub fn insert_cases_batch(&self, location: &str, state: &str, records: &[CaseRecord]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO case_records (location, state, date, cases) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(rusqlite::params![location, state, date_text(record), record.case_count])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_cases(&self, table: &CsvTable) -> Result<usize, StoreError> {
        let location_col = table.require("location")?;
        let cases_col = table.require("cases")?;
        let state_col = table.column("state");
        let date_col = table.column("date");

        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO case_records (location, state, date, cases) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in table.rows() {
                let location = row.get(location_col).copied().unwrap_or_default();
                if location.is_empty() {
                    continue;
                }
                let raw_cases = row.get(cases_col).copied().unwrap_or_default();
                let record = match raw_cases
                    .parse::<f64>()
                    .ok()
                    .filter(|c| c.fract() == 0.0)
                    .map(|c| CaseRecord::from_raw(date_col.and_then(|col| row.get(col).copied()), c as i64))
                {
                    Some(Ok(record)) => record,
                    _ => {
                        tracing::warn!("Skipping case row for {location}: invalid case count '{raw_cases}'");
                        continue;
                    }
                };
                let state = state_col.and_then(|c| row.get(c).copied()).unwrap_or_default();
                stmt.execute(rusqlite::params![location, state, date_text(&record), record.case_count])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Records whose location or state contains `location`, ignoring case.
    /// The query is matched literally, so `%` and `_` are not wildcards.
    pub fn case_history(&self, location: &str) -> Result<Vec<CaseRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, cases FROM case_records
             WHERE instr(lower(location), lower(?1)) > 0
                OR instr(lower(state), lower(?1)) > 0
             ORDER BY id",
        )?;
        let rows = stmt.query_map(rusqlite::params![location.trim()], |row| {
            let date: Option<String> = row.get(0)?;
            let cases: u32 = row.get(1)?;
            Ok(CaseRecord {
                date: date.as_deref().and_then(parse_date),
                case_count: cases,
            })
        })?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn case_record_count(&self) -> Result<usize, StoreError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM case_records", [], |row| {
            row.get::<_, i64>(0).map(|c| c as usize)
        })?)
    }

    pub fn record_assessment(&self, subject: &str, verdict: &RiskVerdict) -> Result<(), StoreError> {
        let json = serde_json::to_string(verdict)?;
        self.conn.execute(
            "INSERT INTO assessments (engine, subject, risk_level, label, score, low_confidence, verdict_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                verdict.engine.as_str(),
                subject,
                verdict.risk_level.rank(),
                verdict.label,
                verdict.numeric_score,
                verdict.low_confidence as i32,
                json,
                verdict.computed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    fn row_to_assessment(row: &rusqlite::Row) -> rusqlite::Result<AssessmentRecord> {
        let rank: u8 = row.get(3)?;
        let low_confidence: i32 = row.get(6)?;
        Ok(AssessmentRecord {
            id: row.get(0)?,
            engine: row.get(1)?,
            subject: row.get(2)?,
            risk_level: RiskLevel::from_rank(rank).unwrap_or(RiskLevel::Low),
            label: row.get(4)?,
            score: row.get(5)?,
            low_confidence: low_confidence != 0,
            verdict_json: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn recent_assessments(&self, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, engine, subject, risk_level, label, score, low_confidence, verdict_json, created_at
             FROM assessments ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], Self::row_to_assessment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn assessments_at_or_above(&self, level: RiskLevel, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, engine, subject, risk_level, label, score, low_confidence, verdict_json, created_at
             FROM assessments WHERE risk_level >= ?1 ORDER BY risk_level DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![level.rank(), limit as i64], Self::row_to_assessment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn assessment_count(&self) -> Result<usize, StoreError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM assessments", [], |row| {
            row.get::<_, i64>(0).map(|c| c as usize)
        })?)
    }
}

fn date_text(record: &CaseRecord) -> Option<String> {
    record.date.map(|d| d.format("%Y-%m-%d").to_string())
}
