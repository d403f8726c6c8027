//! Client-side port for the image collection API, plus the HTTP
//! implementation used against a live server.

use crate::handlers::image_handlers::{ListImagesResponse, UploadResponse};
use crate::models::image::ImageRecord;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The request never produced a usable response.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// One file's worth of upload input: the payload plus the per-item fields
/// the form collected.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub payload: Bytes,
    pub filename: String,
    pub content_type: String,
    pub title: String,
    pub caption: String,
}

/// The three collection operations as the client consumes them.
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn list_images(&self, page: u32, limit: u32) -> Result<Vec<ImageRecord>, ApiError>;

    /// Upload one image; returns the new record's id.
    async fn upload_image(&self, upload: ImageUpload) -> Result<Uuid, ApiError>;

    async fn delete_image(&self, id: Uuid) -> Result<(), ApiError>;
}

/// `ImageApi` over HTTP, one instance per server origin.
pub struct HttpImageApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turn a non-success response into a `Rejected`, pulling the message out
/// of the JSON error body when there is one.
async fn rejection(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => "request failed".to_string(),
    };
    ApiError::Rejected { status, message }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn list_images(&self, page: u32, limit: u32) -> Result<Vec<ImageRecord>, ApiError> {
        let response = self
            .client
            .get(format!("{}/images", self.base_url))
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let body: ListImagesResponse = response.json().await?;
        Ok(body.images)
    }

    async fn upload_image(&self, upload: ImageUpload) -> Result<Uuid, ApiError> {
        let part = multipart::Part::bytes(upload.payload.to_vec())
            .file_name(upload.filename)
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("title", upload.title)
            .text("caption", upload.caption);

        let response = self
            .client
            .post(format!("{}/images", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let body: UploadResponse = response.json().await?;
        Ok(body.image_id)
    }

    async fn delete_image(&self, id: Uuid) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(format!("{}/images/{}", self.base_url, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }
}
