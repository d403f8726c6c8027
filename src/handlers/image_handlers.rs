//! HTTP handlers for the image collection: paginated listing, multipart
//! upload, and deletion. Parsing and coercion of untrusted input happens
//! here; everything past this layer works with validated values.

use crate::{
    errors::AppError,
    models::image::ImageRecord,
    services::gallery_service::{GalleryError, GalleryService, NewImage},
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw query params for `GET /images`. Kept as strings so a non-numeric
/// value falls back to the default instead of failing extraction.
#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListImagesResponse {
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "imageId")]
    pub image_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Coerce an optional query value: missing, non-numeric, or zero all fall
/// back to the default.
fn coerce_param(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

/// GET `/images?page=&limit=` — one page of records, newest first.
pub async fn list_images(
    State(service): State<GalleryService>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<ListImagesResponse>, AppError> {
    let page = coerce_param(query.page.as_deref(), 1);
    let limit = coerce_param(query.limit.as_deref(), service.default_page_size);

    let images = service.list(page, limit).await.map_err(|err| {
        tracing::error!(error = %err, "failed to fetch images");
        AppError::internal("Failed to fetch images")
    })?;

    Ok(Json(ListImagesResponse { images }))
}

/// POST `/images` — multipart upload with fields `file` (required),
/// `title`, and `caption`.
pub async fn upload_image(
    State(service): State<GalleryService>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let new = parse_upload(multipart).await?;

    let image_id = service.create(new).await.map_err(|err| match err {
        GalleryError::EmptyUpload => AppError::bad_request("No file provided"),
        other => {
            tracing::error!(error = %other, "failed to upload image");
            AppError::internal("Failed to upload image").with_details(other.to_string())
        }
    })?;

    Ok(Json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        image_id,
    }))
}

/// DELETE `/images/{id}` — remove a record and its binary.
pub async fn delete_image(
    State(service): State<GalleryService>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid image ID"))?;

    service.delete(id).await.map_err(|err| match err {
        GalleryError::NotFound(_) => AppError::not_found("Image not found"),
        other => {
            tracing::error!(error = %other, "failed to delete image");
            AppError::internal("Failed to delete image")
        }
    })?;

    Ok(Json(DeleteResponse {
        message: "Image deleted successfully".to_string(),
    }))
}

/// Walk the multipart fields into a `NewImage`. Unknown fields are skipped;
/// a missing `file` field is a client error.
async fn parse_upload(mut multipart: Multipart) -> Result<NewImage, AppError> {
    let mut payload = None;
    let mut filename = None;
    let mut title = None;
    let mut caption = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart payload: {err}")))?
    {
        let name = field.name().map(str::to_owned).unwrap_or_default();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read upload: {err}"))
                })?;
                payload = Some(bytes);
            }
            "title" => {
                title = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read title: {err}"))
                })?);
            }
            "caption" => {
                caption = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read caption: {err}"))
                })?);
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| AppError::bad_request("No file provided"))?;

    Ok(NewImage {
        payload,
        filename,
        title,
        caption,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_params_fall_back_to_defaults() {
        assert_eq!(coerce_param(None, 1), 1);
        assert_eq!(coerce_param(None, 12), 12);
    }

    #[test]
    fn non_numeric_params_fall_back_to_defaults() {
        assert_eq!(coerce_param(Some("abc"), 1), 1);
        assert_eq!(coerce_param(Some(""), 12), 12);
        assert_eq!(coerce_param(Some("-3"), 12), 12);
        assert_eq!(coerce_param(Some("2.5"), 12), 12);
    }

    #[test]
    fn zero_is_not_a_valid_page_or_limit() {
        assert_eq!(coerce_param(Some("0"), 1), 1);
        assert_eq!(coerce_param(Some("0"), 12), 12);
    }

    #[test]
    fn numeric_params_pass_through() {
        assert_eq!(coerce_param(Some("3"), 1), 3);
        assert_eq!(coerce_param(Some(" 40 "), 12), 40);
    }
}
