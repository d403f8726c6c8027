//! Object store client.
//!
//! Disk-backed binary store that plays the role of a hosted media provider:
//! `put` accepts a payload plus a logical folder and hands back a public URL
//! and a stable storage key, `delete` removes by key. Payloads live beneath
//! `base_path/{folder}/{shard}/{shard}/{name}` with two md5-derived shard
//! levels to keep directory fan-out bounded; the server exposes them under
//! `{public_base_url}/media/{key}`.

use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_KEY_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("media key `{0}` not found")]
    NotFound(String),
    #[error("invalid media key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaStoreError>;

/// Result of storing a binary: where to fetch it and how to delete it.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// Storage key, kept in the metadata record as the binary's handle.
    pub key: String,
    /// Public URL for direct fetches.
    pub url: String,
    pub size_bytes: i64,
    /// md5 of the payload, reported on fetches.
    pub etag: String,
}

/// Disk-backed media store serving public URLs.
#[derive(Clone)]
pub struct MediaStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl MediaStore {
    /// `public_base_url` is the externally visible origin, without a
    /// trailing slash; stored keys resolve at `{public_base_url}/media/{key}`.
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Keys are generated internally on `put`, but `open` and `delete` take
    /// whatever the caller recorded, and the media route feeds in raw
    /// request paths.
    fn ensure_key_safe(&self, key: &str) -> MediaResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(MediaStoreError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(MediaStoreError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(MediaStoreError::InvalidKey);
        }
        Ok(())
    }

    fn media_path(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    /// Two-level shard identifiers derived from md5 of the stored name,
    /// each a lowercase hex byte (00-ff).
    fn shards(name: &str) -> (String, String) {
        let digest = md5::compute(name);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Build the storage key for a fresh upload. A random UUID keeps
    /// identically named uploads distinct; the original extension is kept so
    /// content types remain guessable from the key.
    fn new_key(folder: &str, filename: &str) -> String {
        let id = Uuid::new_v4();
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let name = format!("{}{}", id, ext);
        let (shard_a, shard_b) = Self::shards(&name);
        format!("{}/{}/{}/{}", folder, shard_a, shard_b, name)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/media/{}", self.public_base_url, key)
    }

    /// Store a payload under `folder` and return its URL and key.
    ///
    /// Writes to a temp file first, fsyncs, then renames into place so a
    /// stored key never resolves to a partial payload. The temp file is
    /// removed on every error path.
    pub async fn put(&self, folder: &str, filename: &str, payload: Bytes) -> MediaResult<StoredMedia> {
        let key = Self::new_key(folder, filename);
        let file_path = self.media_path(&key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            MediaStoreError::Io(io::Error::other("media path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let write_result = async {
            file.write_all(&payload).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaStoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaStoreError::Io(err));
        }

        Ok(StoredMedia {
            url: self.public_url(&key),
            size_bytes: payload.len() as i64,
            etag: format!("{:x}", md5::compute(&payload)),
            key,
        })
    }

    /// Open a stored payload for streaming out. Returns the file handle and
    /// its length.
    pub async fn open(&self, key: &str) -> MediaResult<(File, u64)> {
        self.ensure_key_safe(key)?;
        let file_path = self.media_path(key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaStoreError::NotFound(key.to_string())
            } else {
                MediaStoreError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Remove a stored payload. A key whose file is already gone is treated
    /// as deleted, so a repeated delete converges instead of failing.
    pub async fn delete(&self, key: &str) -> MediaResult<()> {
        self.ensure_key_safe(key)?;
        let file_path = self.media_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed media file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("media file {} already missing", file_path.display());
            }
            Err(err) => return Err(MediaStoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Best-effort write/read/delete cycle under `base_path`, used by the
    /// readiness probe.
    pub async fn probe(&self) -> MediaResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"probe").await?;
        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match read_back {
            Ok(bytes) if bytes == b"probe" => Ok(()),
            Ok(_) => Err(MediaStoreError::Io(io::Error::other("probe content mismatch"))),
            Err(err) => Err(MediaStoreError::Io(err)),
        }
    }

    /// Remove empty shard directories upward until the store root.
    ///
    /// Stops on the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> MediaStore {
        MediaStore::new(dir.path(), "http://localhost:3000/")
    }

    #[tokio::test]
    async fn put_stores_payload_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let stored = store
            .put("gallery", "sunset.JPG", Bytes::from_static(b"not really a jpeg"))
            .await
            .unwrap();

        assert!(stored.key.starts_with("gallery/"));
        assert!(stored.key.ends_with(".jpg"));
        assert_eq!(stored.url, format!("http://localhost:3000/media/{}", stored.key));
        assert_eq!(stored.size_bytes, 17);

        let (_, len) = store.open(&stored.key).await.unwrap();
        assert_eq!(len, 17);
    }

    #[tokio::test]
    async fn identically_named_uploads_get_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let a = store.put("gallery", "cat.png", Bytes::from_static(b"a")).await.unwrap();
        let b = store.put("gallery", "cat.png", Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(a.key, b.key);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let stored = store.put("gallery", "a.png", Bytes::from_static(b"x")).await.unwrap();
        store.delete(&stored.key).await.unwrap();
        assert!(matches!(
            store.open(&stored.key).await,
            Err(MediaStoreError::NotFound(_))
        ));

        // second delete of the same key converges
        store.delete(&stored.key).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        for key in ["../outside", "/etc/passwd", "gallery/../../x", ""] {
            assert!(matches!(
                store.open(key).await,
                Err(MediaStoreError::InvalidKey)
            ));
            assert!(matches!(
                store.delete(key).await,
                Err(MediaStoreError::InvalidKey)
            ));
        }
    }

    #[tokio::test]
    async fn probe_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        store(&dir).probe().await.unwrap();
    }
}
