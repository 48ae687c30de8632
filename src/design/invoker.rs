//! Single model invocation
//!
//! Every call resolves to an image or a `GenerationError` tagged with the
//! style. Backend panics are caught here and never escape.

use std::panic::{self, AssertUnwindSafe};

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::model::{ImageModel, ModelInput};
use super::GenerationRequest;

/// A failed generation for one style
#[derive(Debug, Clone, Error, Serialize)]
#[error("{style} generation failed: {message}")]
pub struct GenerationError {
    pub style: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(style: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            message: message.into(),
        }
    }
}

/// Run one inference pass for `request`
pub fn generate(
    model: &dyn ImageModel,
    request: &GenerationRequest,
    steps: u32,
) -> Result<RgbImage, GenerationError> {
    let prompt = request.prompt();
    let input = ModelInput {
        image: request.canvas.image(),
        prompt: &prompt.positive,
        negative_prompt: &prompt.negative,
        strength: request.strength,
        guidance_scale: request.guidance,
        num_inference_steps: steps,
    };

    debug!(
        "Invoking {} for {} {}",
        model.name(),
        request.style_name,
        request.room_type
    );

    match panic::catch_unwind(AssertUnwindSafe(|| model.img2img(&input))) {
        Ok(Ok(image)) => Ok(image),
        Ok(Err(e)) => Err(GenerationError::new(&request.style_name, e.to_string())),
        Err(payload) => Err(GenerationError::new(
            &request.style_name,
            format!("model panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
