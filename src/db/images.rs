//! Per-page image index.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, ImageRecord};

impl Database {
    /// Upsert the staged location of one page
    ///
    /// A second record for the same position replaces the first.
    pub async fn record_image(
        &self,
        work_title: &str,
        segment: &str,
        position: u32,
        local_path: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO segment_images (work_title, segment, position, local_path, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(work_title, segment, position) DO UPDATE SET
                local_path = excluded.local_path,
                recorded_at = excluded.recorded_at
            "#,
        )
        .bind(work_title)
        .bind(segment)
        .bind(i64::from(position))
        .bind(local_path)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record image: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List the image records of a segment in page order
    pub async fn list_images(&self, work_title: &str, segment: &str) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT work_title, segment, position, local_path
            FROM segment_images
            WHERE work_title = ? AND segment = ?
            ORDER BY position ASC
            "#,
        )
        .bind(work_title)
        .bind(segment)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list images: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
