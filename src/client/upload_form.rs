//! Pending-upload queue and batch submission.
//!
//! Files enter through an all-or-nothing validated add, carry editable
//! title/caption fields addressed by a stable per-item id, and leave either
//! by explicit removal or by a successful upload. Submission issues one
//! create per item concurrently and always settles the whole batch: one
//! failure never aborts the rest, successes leave the queue, failures stay
//! behind for a retry.

use crate::client::api::{ImageApi, ImageUpload};
use bytes::Bytes;
use futures::{StreamExt, stream::FuturesUnordered};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Per-file ceiling applied when adding files to the queue.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Handle for a locally materialized preview (an object URL in a webview, a
/// temp file, a decoded thumbnail). Released at most once; dropping the
/// handle releases it as a backstop.
pub struct PreviewHandle(Option<Box<dyn FnOnce() + Send>>);

impl PreviewHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn release(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle")
            .field(&if self.0.is_some() { "held" } else { "released" })
            .finish()
    }
}

/// A file offered to the queue: payload, declared type, and the preview the
/// caller already materialized for it.
#[derive(Debug)]
pub struct FileCandidate {
    pub filename: String,
    pub content_type: String,
    pub payload: Bytes,
    pub preview: PreviewHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// One queued file awaiting submission.
#[derive(Debug)]
pub struct PendingUpload {
    id: Uuid,
    filename: String,
    content_type: String,
    payload: Bytes,
    preview: PreviewHandle,
    title: String,
    caption: String,
    outcome: UploadOutcome,
}

impl PendingUpload {
    fn from_candidate(candidate: FileCandidate) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: candidate.filename,
            content_type: candidate.content_type,
            payload: candidate.payload,
            preview: candidate.preview,
            title: String::new(),
            caption: String::new(),
            outcome: UploadOutcome::Pending,
        }
    }

    /// Stable identifier; survives reordering and removals around it.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn outcome(&self) -> UploadOutcome {
        self.outcome
    }
}

#[derive(Debug, Error)]
pub enum UploadFormError {
    #[error("Please select only image files")]
    NotAnImage { filename: String },
    #[error("All files must be less than {max_mib} MB")]
    TooLarge { filename: String, max_mib: u64 },
    #[error("Please select at least one image to upload")]
    EmptyQueue,
}

/// Result of one batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    /// When true the caller should refresh its listing view.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// The upload form's state: queue, flags, aggregate progress, and the
/// message surfaced next to the controls.
pub struct UploadForm {
    items: Vec<PendingUpload>,
    uploading: bool,
    progress: f32,
    error: Option<String>,
    success: bool,
    max_file_bytes: u64,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_FILE_BYTES)
    }

    pub fn with_limit(max_file_bytes: u64) -> Self {
        Self {
            items: Vec::new(),
            uploading: false,
            progress: 0.0,
            error: None,
            success: false,
            max_file_bytes,
        }
    }

    /// Append files to the queue, all or nothing: one bad candidate rejects
    /// the whole add before anything is queued or sent anywhere. Rejected
    /// candidates are dropped, which releases their previews.
    pub fn add_files(&mut self, candidates: Vec<FileCandidate>) -> Result<(), UploadFormError> {
        if candidates.is_empty() {
            return Ok(());
        }

        for candidate in &candidates {
            if !candidate.content_type.starts_with("image/") {
                return Err(self.reject(UploadFormError::NotAnImage {
                    filename: candidate.filename.clone(),
                }));
            }
            if candidate.payload.len() as u64 > self.max_file_bytes {
                return Err(self.reject(UploadFormError::TooLarge {
                    filename: candidate.filename.clone(),
                    max_mib: self.max_file_bytes / (1024 * 1024),
                }));
            }
        }

        self.items
            .extend(candidates.into_iter().map(PendingUpload::from_candidate));
        self.error = None;
        Ok(())
    }

    /// Edit the title of the addressed item only. Returns false when the id
    /// is no longer in the queue.
    pub fn set_title(&mut self, id: Uuid, title: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Edit the caption of the addressed item only.
    pub fn set_caption(&mut self, id: Uuid, caption: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.caption = caption.into();
                true
            }
            None => false,
        }
    }

    /// Remove an item from the queue, releasing its preview immediately.
    pub fn remove(&mut self, id: Uuid) {
        if let Some(pos) = self.items.iter().position(|item| item.id == id) {
            let mut item = self.items.remove(pos);
            item.preview.release();
        }
    }

    /// Submit the whole queue: one upload per item, issued concurrently,
    /// all settled before the queue is touched. Succeeded items leave the
    /// queue with their previews released; failed items stay, marked, for
    /// another attempt. The uploading flag is cleared on every exit path.
    pub async fn submit(&mut self, api: &dyn ImageApi) -> Result<BatchOutcome, UploadFormError> {
        if self.items.is_empty() {
            return Err(self.reject(UploadFormError::EmptyQueue));
        }

        self.uploading = true;
        self.progress = 0.0;
        self.error = None;
        self.success = false;
        for item in &mut self.items {
            item.outcome = UploadOutcome::Pending;
        }

        let total = self.items.len();
        let uploads: Vec<(Uuid, ImageUpload)> = self
            .items
            .iter()
            .map(|item| {
                let title = if item.title.trim().is_empty() {
                    item.filename.clone()
                } else {
                    item.title.clone()
                };
                (
                    item.id,
                    ImageUpload {
                        payload: item.payload.clone(),
                        filename: item.filename.clone(),
                        content_type: item.content_type.clone(),
                        title,
                        caption: item.caption.clone(),
                    },
                )
            })
            .collect();

        let mut in_flight: FuturesUnordered<_> = uploads
            .into_iter()
            .map(|(id, upload)| async move { (id, api.upload_image(upload).await) })
            .collect();

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        while let Some((id, result)) = in_flight.next().await {
            match result {
                Ok(_) => {
                    succeeded += 1;
                    self.progress = succeeded as f32 / total as f32 * 100.0;
                    self.mark(id, UploadOutcome::Succeeded);
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(item = %id, error = %err, "upload failed");
                    self.mark(id, UploadOutcome::Failed);
                }
            }
        }
        drop(in_flight);

        let settled = std::mem::take(&mut self.items);
        for mut item in settled {
            if item.outcome == UploadOutcome::Succeeded {
                item.preview.release();
            } else {
                self.items.push(item);
            }
        }

        if failed > 0 {
            self.error = Some(format!("Failed to upload {failed} image(s). Please try again."));
        } else {
            self.success = true;
        }
        self.uploading = false;

        Ok(BatchOutcome {
            total,
            succeeded,
            failed,
        })
    }

    fn mark(&mut self, id: Uuid, outcome: UploadOutcome) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.outcome = outcome;
        }
    }

    fn reject(&mut self, err: UploadFormError) -> UploadFormError {
        self.error = Some(err.to_string());
        err
    }

    pub fn items(&self) -> &[PendingUpload] {
        &self.items
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Aggregate progress over the current batch, 0 to 100.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Clear the success notice once it has been shown.
    pub fn acknowledge_success(&mut self) {
        self.success = false;
    }
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}
