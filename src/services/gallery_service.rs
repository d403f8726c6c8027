//! Image collection service: list, create, delete.
//!
//! Composes the metadata index and the media store. There is no transaction
//! spanning the two; within one create the binary upload strictly precedes
//! the metadata insert, and within one delete the binary removal strictly
//! precedes the row removal. The two resulting inconsistency windows
//! (orphaned binary, dangling record) are logged and otherwise accepted.

use crate::{
    models::image::ImageRecord,
    services::{
        image_index::{ImageIndex, NewImageRecord},
        media_store::{MediaStore, MediaStoreError},
    },
};
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Logical folder every gallery upload lands under.
const UPLOAD_FOLDER: &str = "gallery";

const FALLBACK_TITLE: &str = "Untitled";

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("image `{0}` not found")]
    NotFound(Uuid),
    #[error("upload payload is empty")]
    EmptyUpload,
    #[error("metadata store error: {0}")]
    Index(#[from] sqlx::Error),
    #[error("media store error: {0}")]
    Media(#[from] MediaStoreError),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

/// A validated upload: payload plus the optional user-supplied fields.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub payload: Bytes,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub caption: Option<String>,
}

/// Shared handler state: the collection operations plus the paging limits
/// the HTTP layer coerces against.
#[derive(Clone)]
pub struct GalleryService {
    pub index: ImageIndex,
    pub media: MediaStore,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl GalleryService {
    pub fn new(
        index: ImageIndex,
        media: MediaStore,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Self {
        Self {
            index,
            media,
            default_page_size,
            max_page_size,
        }
    }

    /// One page of records, newest first. `page` counts from 1; `page_size`
    /// is clamped to the configured maximum.
    pub async fn list(&self, page: u64, page_size: u64) -> GalleryResult<Vec<ImageRecord>> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, self.max_page_size);
        let skip = (page - 1) * page_size;
        let records = self.index.list_page(skip, page_size).await?;
        Ok(records)
    }

    /// Upload a binary and insert its metadata record; returns the new id.
    ///
    /// A failed insert after a successful upload leaves the stored binary
    /// behind with no referencing record; the key is logged so an operator
    /// can reconcile.
    pub async fn create(&self, new: NewImage) -> GalleryResult<Uuid> {
        if new.payload.is_empty() {
            return Err(GalleryError::EmptyUpload);
        }

        let filename = new.filename.unwrap_or_default();
        let title = effective_title(new.title.as_deref(), &filename);
        let caption = new.caption.unwrap_or_default();

        let stored = self.media.put(UPLOAD_FOLDER, &filename, new.payload).await?;

        let inserted = self
            .index
            .insert(NewImageRecord {
                url: stored.url,
                public_id: stored.key.clone(),
                title,
                caption,
            })
            .await;

        match inserted {
            Ok(record) => Ok(record.id),
            Err(err) => {
                warn!(key = %stored.key, error = %err, "metadata insert failed, stored binary orphaned");
                Err(GalleryError::Index(err))
            }
        }
    }

    /// Delete a record and its binary. The binary goes first; when the row
    /// removal then fails the record dangles and the id is logged.
    pub async fn delete(&self, id: Uuid) -> GalleryResult<ImageRecord> {
        let record = self
            .index
            .find(id)
            .await?
            .ok_or(GalleryError::NotFound(id))?;

        self.media.delete(&record.public_id).await?;

        match self.index.remove(id).await {
            Ok(true) => Ok(record),
            // Row vanished between the lookup and the delete; a concurrent
            // delete got there first and the outcome is the same.
            Ok(false) => Err(GalleryError::NotFound(id)),
            Err(err) => {
                warn!(%id, error = %err, "metadata delete failed, record dangles without binary");
                Err(GalleryError::Index(err))
            }
        }
    }
}

/// Title precedence: non-blank user title, else the filename, else a fixed
/// fallback.
fn effective_title(title: Option<&str>, filename: &str) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ if !filename.trim().is_empty() => filename.trim().to_string(),
        _ => FALLBACK_TITLE.to_string(),
    }
}
