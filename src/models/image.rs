//! Represents one uploaded image and its metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single image in the gallery.
///
/// The record ties a publicly fetchable URL to the storage key needed to
/// remove the underlying binary later. Records are created once and never
/// updated in place; deletion removes both the row and the binary.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct ImageRecord {
    /// Unique identifier, assigned by the metadata store at insert time.
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Public URL the binary can be fetched from.
    pub url: String,

    /// Media-store key for the binary. Required to delete it; not shown in
    /// any user-facing view.
    #[serde(rename = "publicId")]
    pub public_id: String,

    /// User-supplied title, defaulted at upload time when left blank.
    pub title: String,

    /// User-supplied caption, may be empty.
    pub caption: String,

    /// Creation timestamp; the sole sort key for listing.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
