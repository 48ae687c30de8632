//! Design generation endpoint
//!
//! POST /designs - Redesign an uploaded room photo in up to three styles

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{auth::require_user, error_response, AppState};
use crate::design::{
    canvas, style, BatchReport, DesignError, GenerationError, GenerationParams, RoomType,
    StyleSelection,
};

/// Build the designs router
pub fn router() -> Router<AppState> {
    Router::new().route("/designs", post(create_designs))
}

fn default_strength() -> f32 {
    GenerationParams::default().strength
}

fn default_guidance() -> f32 {
    GenerationParams::default().guidance
}

/// Design request
#[derive(Debug, Deserialize)]
pub struct DesignRequest {
    /// Base64 JPEG or PNG, optionally as a data URL
    pub image: String,
    pub room_type: String,
    #[serde(default = "style::default_selection")]
    pub styles: Vec<String>,
    #[serde(default = "default_strength")]
    pub strength: f32,
    #[serde(default = "default_guidance")]
    pub guidance: f32,
}

/// One generated design
#[derive(Debug, Serialize)]
pub struct DesignView {
    pub style: String,
    pub filename: String,
    pub hash: String,
    pub url: String,
    pub caption: String,
    pub cached: bool,
}

/// One failed style
#[derive(Debug, Serialize)]
pub struct FailureView {
    pub style: String,
    pub error: String,
}

impl From<&GenerationError> for FailureView {
    fn from(e: &GenerationError) -> Self {
        Self {
            style: e.style.clone(),
            error: e.message.clone(),
        }
    }
}

/// Design response
#[derive(Debug, Serialize)]
pub struct DesignResponse {
    pub room_type: RoomType,
    pub message: String,
    pub designs: Vec<DesignView>,
    pub failures: Vec<FailureView>,
}

/// Batch exhaustion response
#[derive(Debug, Serialize)]
pub struct ExhaustedResponse {
    pub error: String,
    pub failures: Vec<FailureView>,
}

/// Download filename for a design
pub fn design_filename(style: &str, room_type: RoomType) -> String {
    format!("{}-{}-design.png", style, room_type.slug())
}

fn design_error_response(err: DesignError) -> Response {
    match err {
        DesignError::BatchExhausted { failures } => (
            StatusCode::BAD_GATEWAY,
            Json(ExhaustedResponse {
                error: "Failed to generate any designs. Please try again with different settings."
                    .to_string(),
                failures: failures.iter().map(FailureView::from).collect(),
            }),
        )
            .into_response(),
        e @ (DesignError::InvalidRoomType(_)
        | DesignError::InvalidStyleSelection(_)
        | DesignError::InvalidParameter(_)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        e @ DesignError::Preprocessing(_) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Decode the upload and fit it to the model canvas
fn prepare_canvas(encoded: &str, size: u32) -> Result<canvas::Canvas, DesignError> {
    let payload = match encoded.split_once("base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| DesignError::Preprocessing(format!("image is not valid base64: {}", e)))?;
    let photo = canvas::decode(&bytes)?;
    canvas::normalize(&photo, size)
}

/// Generate designs for an uploaded room photo
async fn create_designs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DesignRequest>,
) -> Response {
    let user = match require_user(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let room_type: RoomType = match req.room_type.parse() {
        Ok(room_type) => room_type,
        Err(e) => return design_error_response(e),
    };
    let selection = match StyleSelection::new(&req.styles) {
        Ok(selection) => selection,
        Err(e) => return design_error_response(e),
    };
    let params = match GenerationParams::new(req.strength, req.guidance) {
        Ok(params) => params,
        Err(e) => return design_error_response(e),
    };

    // Decode and resize off the async executor
    let size = state.canvas_size;
    let prepared = tokio::task::spawn_blocking(move || prepare_canvas(&req.image, size)).await;
    let canvas = match prepared {
        Ok(Ok(canvas)) => Arc::new(canvas),
        Ok(Err(e)) => return design_error_response(e),
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("image processing failed: {}", e),
            )
        }
    };

    info!(
        "{} requested {} {} designs",
        user.username,
        selection.len(),
        room_type
    );

    let report = match state
        .studio
        .run_batch(canvas, room_type, &selection, params, |p| {
            debug!("Design progress {}/{}", p.completed, p.total)
        })
        .await
    {
        Ok(report) => report,
        Err(e) => return design_error_response(e),
    };

    match render_report(&state, &report, params).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(response) => response,
    }
}

/// Store each successful design and describe the batch
async fn render_report(
    state: &AppState,
    report: &BatchReport,
    params: GenerationParams,
) -> Result<DesignResponse, Response> {
    let mut designs = Vec::new();
    for outcome in &report.outcomes {
        let Ok(image) = &outcome.result else {
            continue;
        };
        let filename = design_filename(&outcome.style, report.room_type);
        let hash = match state.image_store.store_png(image, &filename).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to store {} design: {}", outcome.style, e);
                return Err(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to store generated design",
                ));
            }
        };
        designs.push(DesignView {
            style: outcome.style.clone(),
            url: format!("/images/{}/{}", hash, filename),
            filename,
            hash,
            caption: params.caption(),
            cached: outcome.cached,
        });
    }

    let failures: Vec<FailureView> = report.failures().map(FailureView::from).collect();

    Ok(DesignResponse {
        room_type: report.room_type,
        message: format!(
            "Generated {} designs for your {}!",
            designs.len(),
            report.room_type
        ),
        designs,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(width, height, Rgb([90, 90, 90]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        BASE64.encode(bytes)
    }

    #[test]
    fn test_design_filename() {
        assert_eq!(
            design_filename("rustic", RoomType::Kitchen),
            "rustic-kitchen-design.png"
        );
        assert_eq!(
            design_filename("modern", RoomType::LivingRoom),
            "modern-living-room-design.png"
        );
    }

    #[test]
    fn test_prepare_canvas_accepts_data_url() {
        let encoded = format!("data:image/png;base64,{}", png_base64(20, 10));
        let canvas = prepare_canvas(&encoded, 64).unwrap();
        assert_eq!(canvas.size(), 64);
    }

    #[test]
    fn test_prepare_canvas_rejects_bad_input() {
        assert!(matches!(
            prepare_canvas("!!!", 64),
            Err(DesignError::Preprocessing(_))
        ));
        assert!(matches!(
            prepare_canvas(&BASE64.encode(b"plain text"), 64),
            Err(DesignError::Preprocessing(_))
        ));
    }

    #[test]
    fn test_request_defaults() {
        let req: DesignRequest =
            serde_json::from_value(serde_json::json!({"image": "", "room_type": "kitchen"}))
                .unwrap();
        assert_eq!(req.styles, vec!["modern", "rustic"]);
        assert_eq!(req.strength, 0.5);
        assert_eq!(req.guidance, 7.5);
    }

    #[test]
    fn test_exhausted_maps_to_bad_gateway() {
        let response = design_error_response(DesignError::BatchExhausted {
            failures: vec![GenerationError::new("modern", "boom")],
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = design_error_response(DesignError::InvalidRoomType("garage".into()));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = design_error_response(DesignError::Preprocessing("corrupt".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
