//! Streaming handler for stored binaries. This is the surface behind the
//! public URLs the media store hands out.

use crate::{
    errors::AppError,
    services::{gallery_service::GalleryService, media_store::MediaStoreError},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/media/{*key}` — stream a stored payload.
pub async fn serve_media(
    State(service): State<GalleryService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.media.open(&key).await.map_err(|err| match err {
        MediaStoreError::NotFound(_) | MediaStoreError::InvalidKey => {
            AppError::not_found("Media not found")
        }
        other => {
            tracing::error!(error = %other, "failed to open media");
            AppError::internal("Failed to read media")
        }
    })?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_key(&key)),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    Ok(response)
}

/// Content type guessed from the key's extension; keys are generated with
/// the original upload's extension preserved.
fn content_type_for_key(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default();
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
