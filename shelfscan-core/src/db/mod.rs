//! Database layer for shelfscan
//!
//! This module provides the storage layer using SQLite with:
//! - A fixed, idempotently created schema
//! - The [`DetectionStore`] repository, one connection per operation

pub mod repo;
pub mod schema;

pub use repo::{
    DetectionFilter, DetectionStore, StoreStats, TrainingRow, DEFAULT_DETECTION_LIMIT,
    DEFAULT_MIN_SAMPLES,
};
