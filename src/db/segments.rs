//! Segment records: request counters and the dedup decision.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, SegmentRecord, SegmentVisit};

impl Database {
    /// Record one acquire request for `(work_title, segment)`
    ///
    /// Inserts the record with a count of 1 or increments the existing one, in a
    /// single statement. The returned [`SegmentVisit`] reflects the row after
    /// this request, so concurrent callers each observe a distinct count.
    pub async fn record_segment_request(
        &self,
        work_title: &str,
        segment: &str,
        client_key: &str,
    ) -> Result<SegmentVisit> {
        let now = chrono::Utc::now().timestamp();

        let visit = sqlx::query_as::<_, SegmentVisit>(
            r#"
            INSERT INTO segments (
                work_title, segment, request_count, last_client, first_seen_at, last_seen_at
            ) VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(work_title, segment) DO UPDATE SET
                request_count = request_count + 1,
                last_client = excluded.last_client,
                last_seen_at = excluded.last_seen_at
            RETURNING request_count, canonical_title, completed_at
            "#,
        )
        .bind(work_title)
        .bind(segment)
        .bind(client_key)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record segment request: {}",
                e
            )))
        })?;

        Ok(visit)
    }

    /// Check whether a segment has been seen
    ///
    /// Returns `(found, canonical_title)`; the title is empty until an
    /// extraction for the segment has succeeded.
    pub async fn segment_exists(&self, work_title: &str, segment: &str) -> Result<(bool, String)> {
        let row: Option<Option<String>> = sqlx::query_scalar(
            "SELECT canonical_title FROM segments WHERE work_title = ? AND segment = ?",
        )
        .bind(work_title)
        .bind(segment)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check segment existence: {}",
                e
            )))
        })?;

        Ok(match row {
            Some(title) => (true, title.unwrap_or_default()),
            None => (false, String::new()),
        })
    }

    /// Store the title reported by the content extractor
    pub async fn set_canonical_title(
        &self,
        work_title: &str,
        segment: &str,
        canonical_title: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE segments SET canonical_title = ? WHERE work_title = ? AND segment = ?")
            .bind(canonical_title)
            .bind(work_title)
            .bind(segment)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set canonical title: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Mark a segment's document as assembled
    pub async fn mark_segment_completed(&self, work_title: &str, segment: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query("UPDATE segments SET completed_at = ? WHERE work_title = ? AND segment = ?")
            .bind(now)
            .bind(work_title)
            .bind(segment)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to mark segment completed: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Get a segment record by key
    pub async fn get_segment(
        &self,
        work_title: &str,
        segment: &str,
    ) -> Result<Option<SegmentRecord>> {
        let row = sqlx::query_as::<_, SegmentRecord>(
            r#"
            SELECT
                id, work_title, segment, canonical_title, request_count,
                last_client, first_seen_at, last_seen_at, completed_at
            FROM segments
            WHERE work_title = ? AND segment = ?
            "#,
        )
        .bind(work_title)
        .bind(segment)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get segment: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List all segment records, most recently requested first
    pub async fn list_segments(&self) -> Result<Vec<SegmentRecord>> {
        let rows = sqlx::query_as::<_, SegmentRecord>(
            r#"
            SELECT
                id, work_title, segment, canonical_title, request_count,
                last_client, first_seen_at, last_seen_at, completed_at
            FROM segments
            ORDER BY last_seen_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list segments: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
