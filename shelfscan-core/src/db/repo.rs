//! Database repository layer
//!
//! Provides insert and query operations for detections, videos, and model
//! metrics. Each operation opens a fresh connection and closes it on return.

use crate::error::Result;
use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default row cap for [`DetectionStore::get_detections`]
pub const DEFAULT_DETECTION_LIMIT: usize = 1000;

/// Default group threshold for [`DetectionStore::get_training_data`]
pub const DEFAULT_MIN_SAMPLES: u32 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One aggregated row of training data.
///
/// Detections sharing product, time slot, date, and branch collapse into one
/// row with their occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRow {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_category: Option<String>,
    pub day_of_week: Option<i64>,
    pub hour_of_day: Option<i64>,
    pub date: Option<NaiveDate>,
    pub location_branch: Option<String>,
    /// Number of detections in this group
    pub detection_count: i64,
}

/// Store-wide counters for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_detections: i64,
    pub total_videos: i64,
    pub processed_videos: i64,
    /// Distinct non-null product ids seen in detections
    pub unique_products: i64,
    /// Detections per category, sorted by count descending
    ///
    /// Serializes as a JSON object whose keys keep this order.
    #[serde(serialize_with = "serialize_category_stats")]
    pub category_stats: Vec<(String, i64)>,
}

fn serialize_category_stats<S>(
    stats: &[(String, i64)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(stats.len()))?;
    for (category, count) in stats {
        map.serialize_entry(category, count)?;
    }
    map.end()
}

impl StoreStats {
    /// Detection count for a category, if it has any detections
    pub fn category_count(&self, category: &str) -> Option<i64> {
        self.category_stats
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, count)| *count)
    }
}

/// Filters for [`DetectionStore::get_detections`].
///
/// Unset filters are left out of the query entirely.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    /// Only detections dated on or after this day
    pub start_date: Option<NaiveDate>,
    /// Only detections dated on or before this day
    pub end_date: Option<NaiveDate>,
    /// Filter by product category
    pub category: Option<String>,
    /// Filter by branch
    pub branch: Option<String>,
    /// Maximum number of detections to return
    pub limit: usize,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            category: None,
            branch: None,
            limit: DEFAULT_DETECTION_LIMIT,
        }
    }
}

/// SQLite-backed store for detections, videos, and model metrics.
///
/// Holds only the database path; no connection outlives a single call.
#[derive(Debug, Clone)]
pub struct DetectionStore {
    path: PathBuf,
}

impl DetectionStore {
    /// Open or create a store at the given path
    ///
    /// Creates the parent directory and any missing tables. Safe to call on
    /// every startup; existing data is left untouched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        super::schema::create_schema(&conn)?;

        tracing::info!(path = %store.path.display(), "Detection store opened");
        Ok(store)
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    // ============================================
    // Detection operations
    // ============================================

    /// Insert a detection, returning its generated id
    pub fn add_detection(&self, detection: &NewDetection) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO detections (
                video_id, frame_number, product_id, product_name,
                product_category, confidence, location_branch,
                day_of_week, hour_of_day, date, sticker_bbox,
                product_bbox, frame_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                detection.video_id,
                detection.frame_number,
                detection.product_id,
                detection.product_name,
                detection.product_category,
                detection.confidence,
                detection.location_branch,
                detection.day_of_week,
                detection.hour_of_day,
                detection.date.map(format_date),
                encode_bbox(detection.sticker_bbox.as_ref())?,
                encode_bbox(detection.product_bbox.as_ref())?,
                detection.frame_path,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, video_id = %detection.video_id, "Inserted detection");
        Ok(id)
    }

    /// Query detections, most recent first
    pub fn get_detections(&self, filter: &DetectionFilter) -> Result<Vec<Detection>> {
        let conn = self.connect()?;

        let mut sql = String::from("SELECT * FROM detections WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(start) = filter.start_date {
            sql.push_str(" AND date >= ?");
            params.push(Box::new(format_date(start)));
        }

        if let Some(end) = filter.end_date {
            sql.push_str(" AND date <= ?");
            params.push(Box::new(format_date(end)));
        }

        if let Some(category) = &filter.category {
            sql.push_str(" AND product_category = ?");
            params.push(Box::new(category.clone()));
        }

        if let Some(branch) = &filter.branch {
            sql.push_str(" AND location_branch = ?");
            params.push(Box::new(branch.clone()));
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
        params.push(Box::new(i64::try_from(filter.limit).unwrap_or(i64::MAX)));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let detections = stmt
            .query_map(params_refs.as_slice(), Self::row_to_detection)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(count = detections.len(), "Queried detections");
        Ok(detections)
    }

    fn row_to_detection(row: &Row) -> rusqlite::Result<Detection> {
        Ok(Detection {
            id: row.get("id")?,
            video_id: row.get("video_id")?,
            frame_number: row.get("frame_number")?,
            timestamp: get_timestamp(row, "timestamp")?.ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    column_index(row, "timestamp").unwrap_or_default(),
                    "timestamp".to_string(),
                    Type::Null,
                )
            })?,
            product_id: row.get("product_id")?,
            product_name: row.get("product_name")?,
            product_category: row.get("product_category")?,
            confidence: row.get("confidence")?,
            location_branch: row.get("location_branch")?,
            day_of_week: row.get("day_of_week")?,
            hour_of_day: row.get("hour_of_day")?,
            date: get_date(row, "date")?,
            sticker_bbox: get_json(row, "sticker_bbox")?,
            product_bbox: get_json(row, "product_bbox")?,
            frame_path: row.get("frame_path")?,
        })
    }

    // ============================================
    // Training data
    // ============================================

    /// Aggregate detections dated within `[start, end]` into training rows
    ///
    /// Groups with fewer than `min_samples` detections are dropped. Rows are
    /// ordered by date, newest first.
    pub fn get_training_data(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        min_samples: u32,
    ) -> Result<Vec<TrainingRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                product_id, product_name, product_category,
                day_of_week, hour_of_day, date, location_branch,
                COUNT(*) AS detection_count
            FROM detections
            WHERE date BETWEEN ?1 AND ?2
            GROUP BY product_id, product_name, product_category,
                     day_of_week, hour_of_day, date, location_branch
            HAVING COUNT(*) >= ?3
            ORDER BY date DESC, detection_count DESC
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![format_date(start), format_date(end), min_samples],
                |row| {
                    Ok(TrainingRow {
                        product_id: row.get("product_id")?,
                        product_name: row.get("product_name")?,
                        product_category: row.get("product_category")?,
                        day_of_week: row.get("day_of_week")?,
                        hour_of_day: row.get("hour_of_day")?,
                        date: get_date(row, "date")?,
                        location_branch: row.get("location_branch")?,
                        detection_count: row.get("detection_count")?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(
            groups = rows.len(),
            %start,
            %end,
            min_samples,
            "Aggregated training data"
        );
        Ok(rows)
    }

    // ============================================
    // Video operations
    // ============================================

    /// Register a video, replacing any existing row with the same id
    ///
    /// Replacement is total: `processed` goes back to false and
    /// `upload_date` is reset to now.
    pub fn add_video(
        &self,
        id: &str,
        branch_location: &str,
        contributor_id: &str,
        frame_count: i64,
    ) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO videos (
                id, upload_date, branch_location, contributor_id, frame_count
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, now_timestamp(), branch_location, contributor_id, frame_count],
        )?;
        tracing::debug!(video_id = id, frame_count, "Registered video");
        Ok(())
    }

    /// Mark a video as processed
    ///
    /// Unknown ids are ignored. Returns whether a row was updated.
    pub fn mark_video_processed(&self, id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let updated = conn.execute("UPDATE videos SET processed = TRUE WHERE id = ?1", [id])?;

        if updated == 0 {
            tracing::debug!(video_id = id, "No video to mark processed");
        } else {
            tracing::info!(video_id = id, "Video marked processed");
        }
        Ok(updated > 0)
    }

    /// Get a video by ID
    pub fn get_video_status(&self, id: &str) -> Result<Option<Video>> {
        let conn = self.connect()?;
        let video = conn
            .query_row(
                "SELECT * FROM videos WHERE id = ?1",
                [id],
                Self::row_to_video,
            )
            .optional()?;
        Ok(video)
    }

    /// List videos, newest upload first
    ///
    /// With `processed` set, only videos in that state are returned.
    pub fn list_videos(&self, processed: Option<bool>) -> Result<Vec<Video>> {
        let conn = self.connect()?;

        let mut sql = String::from("SELECT * FROM videos");
        if processed.is_some() {
            sql.push_str(" WHERE processed = ?1");
        }
        sql.push_str(" ORDER BY upload_date DESC, id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let videos = match processed {
            Some(flag) => stmt.query_map([flag], Self::row_to_video)?,
            None => stmt.query_map([], Self::row_to_video)?,
        }
        .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(videos)
    }

    fn row_to_video(row: &Row) -> rusqlite::Result<Video> {
        Ok(Video {
            id: row.get("id")?,
            upload_date: get_timestamp(row, "upload_date")?,
            branch_location: row.get("branch_location")?,
            contributor_id: row.get("contributor_id")?,
            processed: row.get::<_, Option<bool>>("processed")?.unwrap_or(false),
            frame_count: row.get("frame_count")?,
        })
    }

    // ============================================
    // Model metrics
    // ============================================

    /// Append a model evaluation snapshot, returning its id
    pub fn add_model_metrics(&self, metrics: &NewModelMetrics) -> Result<i64> {
        let precision_recall = serde_json::to_string(&metrics.precision_recall)?;
        let feature_importance = serde_json::to_string(&metrics.feature_importance)?;

        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO model_metrics (
                model_version, train_date, accuracy,
                precision_recall, feature_importance
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                metrics.model_version,
                now_timestamp(),
                metrics.accuracy,
                precision_recall,
                feature_importance,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::info!(
            id,
            model_version = %metrics.model_version,
            accuracy = metrics.accuracy,
            "Recorded model metrics"
        );
        Ok(id)
    }

    /// List model metrics, newest first
    pub fn list_model_metrics(
        &self,
        model_version: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ModelMetrics>> {
        let conn = self.connect()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM model_metrics
            WHERE ?1 IS NULL OR model_version = ?1
            ORDER BY train_date DESC, id DESC
            LIMIT ?2
            "#,
        )?;
        let metrics = stmt
            .query_map(params![model_version, limit], Self::row_to_model_metrics)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    fn row_to_model_metrics(row: &Row) -> rusqlite::Result<ModelMetrics> {
        let feature_importance = match get_json(row, "feature_importance")? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    column_index(row, "feature_importance").unwrap_or_default(),
                    Type::Text,
                    Box::new(e),
                )
            })?,
            None => Default::default(),
        };

        Ok(ModelMetrics {
            id: row.get("id")?,
            model_version: row.get("model_version")?,
            train_date: get_timestamp(row, "train_date")?.ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    column_index(row, "train_date").unwrap_or_default(),
                    "train_date".to_string(),
                    Type::Null,
                )
            })?,
            accuracy: row.get("accuracy")?,
            precision_recall: get_json(row, "precision_recall")?
                .unwrap_or(serde_json::Value::Null),
            feature_importance,
        })
    }

    // ============================================
    // Stats
    // ============================================

    /// Snapshot of store-wide counts
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.connect()?;
        let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |r| r.get(0)) };

        let total_detections = count("SELECT COUNT(*) FROM detections")?;
        let total_videos = count("SELECT COUNT(*) FROM videos")?;
        let processed_videos = count("SELECT COUNT(*) FROM videos WHERE processed = TRUE")?;
        let unique_products = count(
            "SELECT COUNT(DISTINCT product_id) FROM detections WHERE product_id IS NOT NULL",
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT product_category, COUNT(*) AS count
            FROM detections
            WHERE product_category IS NOT NULL
            GROUP BY product_category
            ORDER BY count DESC, product_category ASC
            "#,
        )?;
        let category_stats = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, i64)>, _>>()?;

        Ok(StoreStats {
            total_detections,
            total_videos,
            processed_videos,
            unique_products,
            category_stats,
        })
    }
}

// ============================================
// Column codecs
// ============================================

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialize a bounding box; absent, null, and empty values become NULL
fn encode_bbox(bbox: Option<&serde_json::Value>) -> Result<Option<String>> {
    match bbox {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(None),
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
    }
}

fn column_index(row: &Row, column: &str) -> rusqlite::Result<usize> {
    row.as_ref().column_index(column)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a timestamp written either by the store (RFC 3339) or by SQLite's
/// `CURRENT_TIMESTAMP` (`YYYY-MM-DD HH:MM:SS`, UTC)
fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
        })
}

fn get_timestamp(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = column_index(row, column)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_date(row: &Row, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let idx = column_index(row, column)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Decode a JSON column. Bare numbers come back with numeric affinity, so
/// they are accepted alongside text.
fn get_json(row: &Row, column: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    let idx = column_index(row, column)?;
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(i) => Ok(Some(i.into())),
        ValueRef::Real(f) => Ok(Some(f.into())),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
    }
}
