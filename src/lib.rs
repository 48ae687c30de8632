//! interiord - AI interior redesign server daemon
//!
//! Upload a room photo, pick a room type and up to three styles, and get one
//! photorealistic redesign per style from an image-to-image diffusion model.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod design;
pub mod images;
pub mod init;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use db::Database;
use design::{BatchOptions, DesignStudio, ImageModel, StableDiffusionApi};
use images::ImageStore;

/// The interiord server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    studio: Arc<DesignStudio>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server backed by the configured diffusion API
    pub async fn new(config: Config) -> Result<Self> {
        let model = Arc::new(StableDiffusionApi::new(&config.model)?);
        info!("Using diffusion backend at {}", config.model.base_url);
        Self::with_model(config, model).await
    }

    /// Create a server around an already-loaded model
    pub async fn with_model(config: Config, model: Arc<dyn ImageModel>) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref()).await?;
        let options = BatchOptions::from_config(&config.generation);
        info!(
            "Model '{}' ready, {} concurrent generations, {} steps",
            model.name(),
            options.max_concurrency,
            options.steps
        );
        let studio = DesignStudio::new(model, options, &config.cache);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db: Arc::new(db),
            studio: Arc::new(studio),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        let state = api::AppState {
            db: self.db.clone(),
            image_store: ImageStore::new(self.db.pool().clone()),
            studio: self.studio.clone(),
            canvas_size: self.config.generation.canvas_size,
            hash_cost: self.config.auth.hash_cost,
        };
        api::router(state, self.config.max_upload_bytes)
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("interiord listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("interiord shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
