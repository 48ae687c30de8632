//! Input photo normalization
//!
//! Photos arrive in any shape. The model wants a fixed square, so the photo is
//! scaled to fit and centered on a white canvas. Nothing is ever cropped.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use sha2::{Digest, Sha256};

use super::DesignError;

/// Padding color
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// A square, padded image ready for the model
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
    /// Where the resized photo sits on the canvas: (x, y, width, height)
    content: (u32, u32, u32, u32),
    fingerprint: String,
}

impl Canvas {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Side length in pixels
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Placement of the resized photo as (x, y, width, height)
    pub fn content_rect(&self) -> (u32, u32, u32, u32) {
        self.content
    }

    /// SHA-256 over the canvas dimensions and pixels, computed once at
    /// construction
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn pixel_digest(image: &RgbImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}

/// Decode an uploaded JPEG or PNG into RGB
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DesignError> {
    if bytes.is_empty() {
        return Err(DesignError::Preprocessing("empty image".to_string()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| DesignError::Preprocessing(format!("unreadable image: {}", e)))?;
    Ok(img.to_rgb8())
}

/// Fit `image` inside a `target_size` square, preserving aspect ratio
pub fn normalize(image: &RgbImage, target_size: u32) -> Result<Canvas, DesignError> {
    if target_size == 0 {
        return Err(DesignError::Preprocessing(
            "target size must be positive".to_string(),
        ));
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(DesignError::Preprocessing("image has no pixels".to_string()));
    }

    let (new_width, new_height) = fit_dimensions(width, height, target_size);
    let resized = imageops::resize(image, new_width, new_height, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(target_size, target_size, BACKGROUND);
    let offset_x = (target_size - new_width) / 2;
    let offset_y = (target_size - new_height) / 2;
    imageops::overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    Ok(Canvas {
        fingerprint: pixel_digest(&canvas),
        image: canvas,
        content: (offset_x, offset_y, new_width, new_height),
    })
}

/// Scaled dimensions that fit inside the target square.
///
/// The longer side becomes exactly `target_size`; the shorter side is
/// floor(side * target / longer), computed in integers.
fn fit_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let target = target_size as u64;
    let (w, h) = if width >= height {
        (target, height as u64 * target / width as u64)
    } else {
        (width as u64 * target / height as u64, target)
    };
    (w.max(1) as u32, h.max(1) as u32)
}
