//! Image serving endpoints
//!
//! GET /images/{hash}            - Download a generated design by content hash
//! GET /images/{hash}/{filename} - Same bytes, saved under `filename`
//!
//! Both require a logged-in user.

use std::sync::LazyLock;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use regex::Regex;

use super::{auth::require_user, error_response, AppState};

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,95}\.png$").expect("valid filename regex")
});

/// Build the images router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{hash}", get(get_image))
        .route("/{hash}/{filename}", get(get_named_image))
}

/// Serve an image under the name it was first stored with
async fn get_image(
    Path(hash): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &headers, &hash, None).await
}

/// Serve an image under the requested download name
///
/// Identical pixels generated for two styles share one stored blob, so the
/// name has to come from the link rather than the blob.
async fn get_named_image(
    Path((hash, filename)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !FILENAME_RE.is_match(&filename) {
        return error_response(StatusCode::BAD_REQUEST, "invalid download filename");
    }
    serve(&state, &headers, &hash, Some(filename)).await
}

async fn serve(
    state: &AppState,
    headers: &HeaderMap,
    hash: &str,
    filename: Option<String>,
) -> Response {
    if let Err(resp) = require_user(state, headers).await {
        return resp;
    }

    match state.image_store.get(hash).await {
        Ok(Some(image)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, image.mime_type),
                (
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"{}\"",
                        filename.unwrap_or(image.filename)
                    ),
                ),
                (
                    header::CACHE_CONTROL,
                    "private, max-age=31536000, immutable".to_string(),
                ),
            ],
            image.data,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Image not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response(),
    }
}
