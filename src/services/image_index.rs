//! Metadata store client.
//!
//! Thin wrapper over a shared SQLite pool holding one row per image.
//! Assigns identifiers and creation timestamps at insert time; listing is
//! ordered by creation time descending with `rowid` as the tiebreak so
//! records inserted in the same instant still paginate without duplicates
//! or gaps.

use crate::models::image::ImageRecord;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Fields the caller provides for a new record; id and timestamp are
/// assigned here.
#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub url: String,
    pub public_id: String,
    pub title: String,
    pub caption: String,
}

/// Client for the image metadata table.
#[derive(Clone)]
pub struct ImageIndex {
    db: Arc<SqlitePool>,
}

impl ImageIndex {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new record, assigning its id and creation timestamp.
    pub async fn insert(&self, new: NewImageRecord) -> Result<ImageRecord, sqlx::Error> {
        let record = ImageRecord {
            id: Uuid::new_v4(),
            url: new.url,
            public_id: new.public_id,
            title: new.title,
            caption: new.caption,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO images (id, url, public_id, title, caption, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(&record.url)
        .bind(&record.public_id)
        .bind(&record.title)
        .bind(&record.caption)
        .bind(record.created_at)
        .execute(&*self.db)
        .await?;

        Ok(record)
    }

    /// Fetch a record by id, `None` when no row matches.
    pub async fn find(&self, id: Uuid) -> Result<Option<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, url, public_id, title, caption, created_at
             FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    /// One page of records, newest first.
    pub async fn list_page(&self, skip: u64, limit: u64) -> Result<Vec<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, url, public_id, title, caption, created_at
             FROM images
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(skip as i64)
        .fetch_all(&*self.db)
        .await
    }

    /// Delete a record by id. Returns `false` when no row matched, which is
    /// how a repeated delete of the same id is observed.
    pub async fn remove(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lightweight connectivity check used by the readiness probe.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}
