//! Content-addressed image storage
//!
//! Generated designs are stored by the SHA-256 of their PNG bytes, so the
//! same design produced twice (e.g. from the cache) is stored once. The
//! stored filename is the first writer's; design links carry their own name.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

/// Image data from storage
#[derive(Debug, Clone)]
pub struct ImageData {
    pub hash: String,
    pub data: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

/// Image store errors
#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Content-addressed image store
#[derive(Clone)]
pub struct ImageStore {
    pool: SqlitePool,
}

impl ImageStore {
    /// Create a new image store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Compute SHA-256 hash of data
    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Store raw bytes under their hash; returns the hash
    pub async fn store(
        &self,
        data: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<String, ImageStoreError> {
        let hash = Self::compute_hash(data);
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO image_store (hash, data, mime_type, filename, size_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(hash) DO NOTHING",
        )
        .bind(&hash)
        .bind(data)
        .bind(mime_type)
        .bind(filename)
        .bind(data.len() as i64)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        debug!("Stored image {} ({} bytes) as {}", hash, data.len(), filename);
        Ok(hash)
    }

    /// Encode as PNG and store
    pub async fn store_png(&self, image: &RgbImage, filename: &str) -> Result<String, ImageStoreError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        self.store(&png, "image/png", filename).await
    }

    /// Get image by hash
    pub async fn get(&self, hash: &str) -> Result<Option<ImageData>, ImageStoreError> {
        let row: Option<(String, Vec<u8>, String, String)> = sqlx::query_as(
            "SELECT hash, data, mime_type, filename FROM image_store WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(hash, data, mime_type, filename)| ImageData {
            hash,
            data,
            mime_type,
            filename,
        }))
    }
}
