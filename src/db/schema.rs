use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS case_records (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            location    TEXT NOT NULL,
            state       TEXT NOT NULL DEFAULT '',
            date        TEXT,             -- NULL when the source date was unusable
            cases       INTEGER NOT NULL CHECK (cases >= 0)
        );

        CREATE TABLE IF NOT EXISTS assessments (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            engine         TEXT NOT NULL,
            subject        TEXT NOT NULL,
            risk_level     INTEGER NOT NULL, -- RiskLevel::rank()
            label          TEXT NOT NULL,
            score          REAL NOT NULL,
            low_confidence INTEGER NOT NULL,
            verdict_json   TEXT NOT NULL,
            created_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_case_records_location ON case_records(location);
        CREATE INDEX IF NOT EXISTS idx_assessments_created ON assessments(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_assessments_level ON assessments(risk_level DESC);
        ",
    )?;
    Ok(())
}
