//! Database layer for segment-dl
//!
//! Handles SQLite persistence for segment records and their page images.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`segments`] - Segment records, request counters and dedup decisions
//! - [`images`] - Per-page image index

use crate::types::{ImageInfo, SegmentInfo};
use chrono::{TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod images;
mod migrations;
mod segments;

/// Segment record from database
#[derive(Debug, Clone, FromRow)]
pub struct SegmentRecord {
    /// Unique database ID
    pub id: i64,
    /// Work identifier as requested
    pub work_title: String,
    /// Segment identifier as requested
    pub segment: String,
    /// Title reported by the content extractor
    pub canonical_title: Option<String>,
    /// Number of acquire requests seen for this key
    pub request_count: i64,
    /// Client key of the latest request
    pub last_client: Option<String>,
    /// Unix timestamp of the first request
    pub first_seen_at: i64,
    /// Unix timestamp of the latest request
    pub last_seen_at: i64,
    /// Unix timestamp of the latest successful assembly
    pub completed_at: Option<i64>,
}

impl From<SegmentRecord> for SegmentInfo {
    fn from(row: SegmentRecord) -> Self {
        SegmentInfo {
            work: row.work_title,
            segment: row.segment,
            canonical_title: row.canonical_title,
            request_count: row.request_count,
            last_client: row.last_client,
            first_seen_at: timestamp(row.first_seen_at),
            last_seen_at: timestamp(row.last_seen_at),
            completed_at: row.completed_at.map(timestamp),
        }
    }
}

/// State of a segment as observed by the request that just touched it
///
/// Produced atomically by [`Database::record_segment_request`], so exactly one
/// request per key ever sees `request_count == 1`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SegmentVisit {
    /// Counter value after this request was recorded
    pub request_count: i64,
    /// Title stored by an earlier successful extraction
    pub canonical_title: Option<String>,
    /// Unix timestamp of the latest successful assembly
    pub completed_at: Option<i64>,
}

impl SegmentVisit {
    /// Whether this request created the record
    pub fn is_first(&self) -> bool {
        self.request_count == 1
    }

    /// Whether a document has been assembled for this segment before
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Image record from database
#[derive(Debug, Clone, FromRow)]
pub struct ImageRecord {
    /// Work identifier
    pub work_title: String,
    /// Segment identifier
    pub segment: String,
    /// Page position
    pub position: i64,
    /// Staging path the page was written to
    pub local_path: String,
}

impl From<ImageRecord> for ImageInfo {
    fn from(row: ImageRecord) -> Self {
        ImageInfo {
            position: u32::try_from(row.position).unwrap_or_default(),
            local_path: row.local_path,
        }
    }
}

fn timestamp(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Database handle for segment-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
