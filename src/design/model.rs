//! Image-to-image model boundary
//!
//! Provides:
//! - `ImageModel` trait: the single synchronous call into a diffusion model
//! - `StableDiffusionApi`: backend speaking the Stable Diffusion web API

use std::io::Cursor;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::config::ModelConfig;

/// Everything one inference pass needs
#[derive(Debug, Clone)]
pub struct ModelInput<'a> {
    pub image: &'a RgbImage,
    pub prompt: &'a str,
    pub negative_prompt: &'a str,
    pub strength: f32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
}

/// Failures reported by a model backend
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned no image")]
    NoImage,

    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("{0}")]
    Inference(String),
}

/// A pretrained image-to-image model.
///
/// Calls block for the whole inference pass. Implementations must tolerate
/// concurrent calls from several worker threads.
pub trait ImageModel: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Run one image-to-image pass
    fn img2img(&self, input: &ModelInput<'_>) -> Result<RgbImage, ModelError>;
}

/// img2img request body
#[derive(Debug, Serialize)]
struct Img2ImgRequest<'a> {
    init_images: Vec<String>,
    prompt: &'a str,
    negative_prompt: &'a str,
    denoising_strength: f32,
    cfg_scale: f32,
    steps: u32,
    width: u32,
    height: u32,
}

/// img2img response body
#[derive(Debug, Deserialize)]
struct Img2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Stable Diffusion web API client (`/sdapi/v1/img2img`)
#[derive(Debug)]
pub struct StableDiffusionApi {
    client: Client,
    base_url: String,
    runtime: Handle,
}

impl StableDiffusionApi {
    /// Create a client bound to the current tokio runtime
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            runtime: Handle::try_current()?,
        })
    }

    async fn request(&self, input: &ModelInput<'_>) -> Result<RgbImage, ModelError> {
        let body = Img2ImgRequest {
            init_images: vec![encode_png_base64(input.image)?],
            prompt: input.prompt,
            negative_prompt: input.negative_prompt,
            denoising_strength: input.strength,
            cfg_scale: input.guidance_scale,
            steps: input.num_inference_steps,
            width: input.image.width(),
            height: input.image.height(),
        };

        debug!(
            "Sending img2img request ({} steps, strength {}, guidance {})",
            body.steps, body.denoising_strength, body.cfg_scale
        );

        let response = self
            .client
            .post(format!("{}/sdapi/v1/img2img", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Diffusion API error: {} - {}", status, body);
            return Err(ModelError::Api { status, body });
        }

        let parsed: Img2ImgResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidOutput(format!("failed to parse response: {}", e)))?;

        let encoded = parsed.images.first().ok_or(ModelError::NoImage)?;
        decode_base64_image(encoded)
    }
}

impl ImageModel for StableDiffusionApi {
    fn name(&self) -> &str {
        "stable-diffusion-api"
    }

    /// Must be called off the async executor (e.g. from `spawn_blocking`)
    fn img2img(&self, input: &ModelInput<'_>) -> Result<RgbImage, ModelError> {
        self.runtime.block_on(self.request(input))
    }
}

/// PNG-encode and base64 an image
pub fn encode_png_base64(image: &RgbImage) -> Result<String, ModelError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ModelError::InvalidOutput(format!("failed to encode image: {}", e)))?;
    Ok(BASE64.encode(png))
}

/// Decode a base64 image, tolerating a `data:` URL prefix
pub fn decode_base64_image(encoded: &str) -> Result<RgbImage, ModelError> {
    let payload = match encoded.split_once("base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| ModelError::InvalidOutput(format!("bad base64: {}", e)))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| ModelError::InvalidOutput(format!("bad image data: {}", e)))?;
    Ok(img.to_rgb8())
}
