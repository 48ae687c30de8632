//! HTTP API module - REST endpoints

mod auth;
mod designs;
mod images;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::accounts::AccountService;
use crate::db::Database;
use crate::design::{style, DesignStudio, RoomType, GUIDANCE_RANGE, STRENGTH_RANGE};
use crate::images::ImageStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub image_store: ImageStore,
    pub studio: Arc<DesignStudio>,
    /// Side of the square canvas uploads are normalized to
    pub canvas_size: u32,
    /// bcrypt cost for new password hashes
    pub hash_cost: u32,
}

impl AppState {
    /// Account service over the shared pool
    pub(crate) fn accounts(&self) -> AccountService {
        AccountService::new(self.db.pool().clone()).with_hash_cost(self.hash_cost)
    }
}

/// Build the API router
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .route("/styles", get(styles))
        .merge(auth::router())
        .merge(designs::router())
        .nest("/images", images::router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON error body with a status code
pub(crate) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "interiord",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model = state.studio.model_name().to_string();
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
                model,
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
                model,
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    model: String,
}

/// Slider bounds
#[derive(Serialize)]
struct Range {
    min: f32,
    max: f32,
    step: f32,
    default: f32,
}

#[derive(Serialize)]
struct RoomTypeInfo {
    id: RoomType,
    name: &'static str,
}

#[derive(Serialize)]
struct StylesResponse {
    room_types: Vec<RoomTypeInfo>,
    styles: &'static [style::Style],
    max_styles: usize,
    default_styles: Vec<String>,
    strength: Range,
    guidance: Range,
}

/// Options for the design form
async fn styles() -> impl IntoResponse {
    Json(StylesResponse {
        room_types: RoomType::ALL
            .iter()
            .map(|r| RoomTypeInfo {
                id: *r,
                name: r.name(),
            })
            .collect(),
        styles: &style::CATALOG,
        max_styles: style::MAX_STYLES,
        default_styles: style::default_selection(),
        strength: Range {
            min: STRENGTH_RANGE.0,
            max: STRENGTH_RANGE.1,
            step: 0.05,
            default: 0.5,
        },
        guidance: Range {
            min: GUIDANCE_RANGE.0,
            max: GUIDANCE_RANGE.1,
            step: 0.5,
            default: 7.5,
        },
    })
}
