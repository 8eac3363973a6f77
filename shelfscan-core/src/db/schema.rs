//! Database schema
//!
//! The schema is fixed. Creation is additive and idempotent: every table is
//! created with `IF NOT EXISTS` and existing tables are never altered.

use rusqlite::Connection;

use crate::error::Result;

/// Tables owned by the store, in creation order
pub const TABLES: &[&str] = &["detections", "videos", "model_metrics"];

const SCHEMA: &str = r#"
    -- One row per detected product/sticker in a video frame
    CREATE TABLE IF NOT EXISTS detections (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id         TEXT NOT NULL,
        frame_number     INTEGER,
        timestamp        DATETIME DEFAULT CURRENT_TIMESTAMP,
        product_id       TEXT,
        product_name     TEXT,
        product_category TEXT,
        confidence       FLOAT,
        location_branch  TEXT,
        day_of_week      INTEGER,
        hour_of_day      INTEGER,
        date             DATE,
        sticker_bbox     TEXT,
        product_bbox     TEXT,
        frame_path       TEXT
    );

    -- Uploaded videos and their processing state
    CREATE TABLE IF NOT EXISTS videos (
        id               TEXT PRIMARY KEY,
        upload_date      DATETIME,
        branch_location  TEXT,
        contributor_id   TEXT,
        processed        BOOLEAN DEFAULT FALSE,
        frame_count      INTEGER
    );

    -- Append-only log of training run evaluations
    CREATE TABLE IF NOT EXISTS model_metrics (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        model_version      TEXT,
        train_date         DATETIME,
        accuracy           FLOAT,
        precision_recall   JSON,
        feature_importance JSON
    );
"#;

/// Create any missing tables
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Returns true if `table` exists in the connected database
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
        [table],
        |r| r.get(0),
    )?;
    Ok(count == 1)
}
