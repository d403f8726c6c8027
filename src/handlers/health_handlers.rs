//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks DB connectivity and disk I/O

use crate::services::gallery_service::GalleryService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe, always 200 OK with a plain JSON body. Never
/// performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Pings the metadata store (`SELECT 1`).
/// 2. Runs a best-effort write/read/delete cycle in the media directory.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(service): State<GalleryService>) -> impl IntoResponse {
    let index_check = match service.index.ping().await {
        Ok(()) => (true, None::<String>),
        Err(err) => (false, Some(err.to_string())),
    };

    let media_check = match service.media.probe().await {
        Ok(()) => (true, None::<String>),
        Err(err) => (false, Some(err.to_string())),
    };

    let overall_ok = index_check.0 && media_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "metadata",
        CheckStatus {
            ok: index_check.0,
            error: index_check.1,
        },
    );
    checks.insert(
        "media",
        CheckStatus {
            ok: media_check.0,
            error: media_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
