//! # shelfscan-core
//!
//! Core library for shelfscan - the persistence layer of a retail
//! video-analytics pipeline.
//!
//! This library provides:
//! - Domain types for detections, videos, and model metrics
//! - The [`DetectionStore`], a SQLite-backed store over those three tables
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Connection model
//!
//! The store holds only a path. Every operation opens its own connection,
//! runs a single statement (a handful of reads for [`DetectionStore::get_stats`]),
//! and closes it again. Concurrent writers rely on SQLite's file locking.
//!
//! ## Example
//!
//! ```rust,no_run
//! use shelfscan_core::{DetectionFilter, DetectionStore, NewDetection};
//!
//! let store = DetectionStore::open("data/detections.db").expect("failed to open store");
//!
//! let id = store
//!     .add_detection(&NewDetection {
//!         frame_number: Some(42),
//!         product_category: Some("bakery".to_string()),
//!         ..NewDetection::new("video-001")
//!     })
//!     .expect("failed to insert detection");
//!
//! let recent = store
//!     .get_detections(&DetectionFilter::default())
//!     .expect("failed to query detections");
//! assert_eq!(recent[0].id, id);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{DetectionFilter, DetectionStore, StoreStats, TrainingRow, DEFAULT_MIN_SAMPLES};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
