//! Defines the HTTP surface of the gallery service.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `GET    /images`       — list, paginated via `?page=&limit=`
//!   - `POST   /images`       — multipart upload (`file`, `title`, `caption`)
//!   - `DELETE /images/{id}`  — delete a record and its binary
//!
//! - **Media endpoint**
//!   - `GET /media/{*key}`    — stream a stored binary (the public URLs)
//!
//! - **Probes** (mounted at root)
//!   - `GET /healthz`, `GET /readyz`
//!
//! The wildcard `*key` matches the sharded keys the media store generates,
//! e.g. `gallery/3f/a1/....png`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{delete_image, list_images, upload_image},
        media_handlers::serve_media,
    },
    services::gallery_service::GalleryService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get},
};

/// Slack on top of the configured upload ceiling for multipart framing and
/// the title/caption fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build and return the router for all gallery routes.
///
/// The router carries shared state (`GalleryService`) to all handlers.
/// `max_upload_bytes` caps request bodies on the upload path.
pub fn routes(max_upload_bytes: usize) -> Router<GalleryService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // collection routes
        .route("/images", get(list_images).post(upload_image))
        .route("/images/{id}", delete(delete_image))
        // public media route
        .route("/media/{*key}", get(serve_media))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
}
