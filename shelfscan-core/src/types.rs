//! Core domain types for shelfscan
//!
//! These types mirror the three tables owned by the
//! [`DetectionStore`](crate::DetectionStore).
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Detection** | One recognized product/sticker instance in a specific video frame |
//! | **Video** | One uploaded video asset and its processing state |
//! | **Branch** | A physical retail location identifier |
//! | **ModelMetrics** | One recorded evaluation of a trained model version |
//!
//! Read-side records (`Detection`, `Video`, `ModelMetrics`) serialize to a
//! key-value mapping whose keys are the column names. Insert-side records
//! (`NewDetection`, `NewModelMetrics`) carry only caller-supplied fields;
//! ids and insert timestamps are assigned by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Detection
// ============================================

/// A stored detection row.
///
/// Rows are immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Auto-increment primary key
    pub id: i64,
    /// Video this detection came from (not enforced as a foreign key)
    pub video_id: String,
    pub frame_number: Option<i64>,
    /// Insert time, assigned by the database
    pub timestamp: DateTime<Utc>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_category: Option<String>,
    /// Detector confidence, nominally in [0, 1]
    pub confidence: Option<f64>,
    pub location_branch: Option<String>,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: Option<i64>,
    /// 0..=23
    pub hour_of_day: Option<i64>,
    pub date: Option<NaiveDate>,
    /// Sticker bounding box, decoded from its JSON column
    pub sticker_bbox: Option<serde_json::Value>,
    /// Product bounding box, decoded from its JSON column
    pub product_bbox: Option<serde_json::Value>,
    /// Path of the saved frame image
    pub frame_path: Option<String>,
}

/// Fields supplied by the detection pipeline for a new detection.
///
/// Ranges (confidence, day of week, hour of day) are not validated.
///
/// ```
/// use shelfscan_core::NewDetection;
///
/// let detection = NewDetection {
///     frame_number: Some(120),
///     product_id: Some("sku-881".to_string()),
///     ..NewDetection::new("video-001")
/// };
/// assert_eq!(detection.video_id, "video-001");
/// assert!(detection.confidence.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDetection {
    pub video_id: String,
    pub frame_number: Option<i64>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_category: Option<String>,
    pub confidence: Option<f64>,
    pub location_branch: Option<String>,
    pub day_of_week: Option<i64>,
    pub hour_of_day: Option<i64>,
    pub date: Option<NaiveDate>,
    pub sticker_bbox: Option<serde_json::Value>,
    pub product_bbox: Option<serde_json::Value>,
    pub frame_path: Option<String>,
}

impl NewDetection {
    /// Create a detection for `video_id` with every optional field unset
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            ..Default::default()
        }
    }
}

// ============================================
// Video
// ============================================

/// An uploaded video and its processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Caller-supplied primary key
    pub id: String,
    /// When the video was (last) registered
    pub upload_date: Option<DateTime<Utc>>,
    pub branch_location: Option<String>,
    pub contributor_id: Option<String>,
    /// Set once the detection pipeline has finished with the video
    pub processed: bool,
    pub frame_count: Option<i64>,
}

// ============================================
// Model metrics
// ============================================

/// A stored model evaluation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub id: i64,
    pub model_version: String,
    pub train_date: DateTime<Utc>,
    /// `None` if the run reported a non-finite accuracy (stored as NULL)
    pub accuracy: Option<f64>,
    /// Precision/recall breakdown, kept opaque
    pub precision_recall: serde_json::Value,
    /// Feature name to importance weight; non-finite weights read back as `None`
    pub feature_importance: BTreeMap<String, Option<f64>>,
}

/// Evaluation results of a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModelMetrics {
    pub model_version: String,
    pub accuracy: f64,
    pub precision_recall: serde_json::Value,
    pub feature_importance: BTreeMap<String, f64>,
}
