//! Room redesign pipeline
//!
//! Provides:
//! - Prompt construction per room type and style
//! - Canvas normalization of uploaded photos
//! - Single model invocations with typed failures
//! - Concurrent multi-style batches with a result cache

pub mod batch;
pub mod cache;
pub mod canvas;
pub mod invoker;
pub mod model;
pub mod prompt;
pub mod room;
pub mod style;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use batch::{BatchOptions, BatchProgress, BatchReport, DesignStudio, StyleOutcome};
pub use cache::GenerationCache;
pub use canvas::Canvas;
pub use invoker::GenerationError;
pub use model::{ImageModel, ModelError, ModelInput, StableDiffusionApi};
pub use prompt::{build_prompt, PromptPair};
pub use room::RoomType;
pub use style::{Style, StyleSelection};

/// Allowed transformation strength
pub const STRENGTH_RANGE: (f32, f32) = (0.3, 0.8);
/// Allowed guidance scale
pub const GUIDANCE_RANGE: (f32, f32) = (5.0, 10.0);

/// Errors that stop a design request as a whole
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("invalid room type: {0}")]
    InvalidRoomType(String),

    #[error("invalid style selection: {0}")]
    InvalidStyleSelection(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("could not process image: {0}")]
    Preprocessing(String),

    #[error("no designs generated ({} styles failed)", failures.len())]
    BatchExhausted { failures: Vec<GenerationError> },
}

/// User-tunable generation knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// How far the output may drift from the input structure
    pub strength: f32,
    /// How strongly the output follows the prompt
    pub guidance: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            strength: 0.5,
            guidance: 7.5,
        }
    }
}

impl GenerationParams {
    /// Validate both knobs against their ranges
    pub fn new(strength: f32, guidance: f32) -> Result<Self, DesignError> {
        check_range("strength", strength, STRENGTH_RANGE)?;
        check_range("guidance", guidance, GUIDANCE_RANGE)?;
        Ok(Self { strength, guidance })
    }

    /// Caption shown under each design
    pub fn caption(&self) -> String {
        format!(
            "Transformation: {}% | Style intensity: {}%",
            (self.strength * 100.0).round() as i32,
            (self.guidance * 10.0).round() as i32
        )
    }
}

fn check_range(name: &str, value: f32, (min, max): (f32, f32)) -> Result<(), DesignError> {
    if !value.is_finite() || value < min || value > max {
        return Err(DesignError::InvalidParameter(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// One style's worth of work within a batch
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub canvas: Arc<Canvas>,
    pub room_type: RoomType,
    pub style_name: String,
    pub style_description: String,
    pub strength: f32,
    pub guidance: f32,
}

impl GenerationRequest {
    pub fn new(canvas: Arc<Canvas>, room_type: RoomType, style: Style, params: GenerationParams) -> Self {
        Self {
            canvas,
            room_type,
            style_name: style.name.to_string(),
            style_description: style.description.to_string(),
            strength: params.strength,
            guidance: params.guidance,
        }
    }

    pub fn prompt(&self) -> PromptPair {
        build_prompt(self.room_type, &self.style_name, &self.style_description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_ranges() {
        assert!(GenerationParams::new(0.3, 5.0).is_ok());
        assert!(GenerationParams::new(0.8, 10.0).is_ok());
        assert!(matches!(
            GenerationParams::new(0.29, 7.5),
            Err(DesignError::InvalidParameter(_))
        ));
        assert!(matches!(
            GenerationParams::new(0.5, 10.5),
            Err(DesignError::InvalidParameter(_))
        ));
        assert!(GenerationParams::new(f32::NAN, 7.5).is_err());
    }

    #[test]
    fn test_caption() {
        let params = GenerationParams::new(0.55, 7.5).unwrap();
        assert_eq!(params.caption(), "Transformation: 55% | Style intensity: 75%");
    }

    #[test]
    fn test_batch_exhausted_message() {
        let err = DesignError::BatchExhausted { failures: vec![] };
        assert!(err.to_string().starts_with("no designs generated"));
    }
}
