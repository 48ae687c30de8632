//! Common test utilities - InteriorTest harness for end-to-end testing

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, Rgb, RgbImage};
use interiord::design::{ImageModel, ModelError, ModelInput};
use interiord::{Config, Server};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Deterministic stand-in for the diffusion backend
///
/// Returns a flat image the size of the canvas, tinted by prompt unless
/// `uniform`. Styles listed in `failing` produce an inference error instead.
pub struct FakeModel {
    failing: Vec<String>,
    uniform: bool,
    calls: AtomicUsize,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::failing(&[])
    }

    pub fn failing(styles: &[&str]) -> Self {
        Self {
            failing: styles.iter().map(|s| s.to_string()).collect(),
            uniform: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Same pixels for every style
    pub fn uniform() -> Self {
        Self {
            uniform: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    fn img2img(&self, input: &ModelInput<'_>) -> Result<RgbImage, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failing
            .iter()
            .any(|style| input.prompt.starts_with(&format!("a photorealistic {} ", style)));
        if failed {
            return Err(ModelError::Inference("out of memory".to_string()));
        }
        // Tint by prompt so each style yields distinct pixels
        let tint = if self.uniform {
            128
        } else {
            input.prompt.bytes().fold(0u8, |acc, b| acc.wrapping_add(b))
        };
        let (width, height) = input.image.dimensions();
        Ok(RgbImage::from_pixel(width, height, Rgb([tint, 80, 40])))
    }
}

/// Test harness that spawns a real interiord server on a random port
pub struct InteriorTest {
    pub addr: SocketAddr,
    pub client: Client,
    pub model: Arc<FakeModel>,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl InteriorTest {
    /// Start a server backed by a model that always succeeds
    pub async fn start() -> Result<Self> {
        Self::start_with(FakeModel::new()).await
    }

    /// Start a server backed by the given fake model
    pub async fn start_with(model: FakeModel) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mut config = Config {
            bind_addr: addr,
            db_path: None, // In-memory for tests
            ..Config::default()
        };
        config.generation.canvas_size = 64;
        config.generation.steps = 4;
        // Cheapest bcrypt cost keeps signups fast
        config.auth.hash_cost = 4;

        let model = Arc::new(model);
        let server = Arc::new(Server::with_model(config, model.clone()).await?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            model,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a GET request with a bearer token
    pub async fn get_with_token(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// POST /designs with a bearer token
    pub async fn post_designs(&self, token: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}/designs", self.base_url()))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Sign up and log in, returning the session token
    pub async fn login_new_user(&self, username: &str) -> Result<String> {
        let gmail = format!("{}@gmail.com", username);
        let resp = self
            .post(
                "/auth/signup",
                &json!({"username": username, "gmail": gmail, "password": "password123"}),
            )
            .await?;
        anyhow::ensure!(resp.status() == 201, "signup failed: {}", resp.status());

        let resp = self
            .post(
                "/auth/login",
                &json!({"gmail": gmail, "password": "password123"}),
            )
            .await?;
        anyhow::ensure!(resp.status() == 200, "login failed: {}", resp.status());
        let body: Value = resp.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("login response has no token"))
    }

    /// Get direct access to the database for test setup/assertions
    pub fn db(&self) -> Arc<interiord::db::Database> {
        self.server.db()
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for InteriorTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

/// A small room photo as base64 PNG
pub fn room_photo_base64(width: u32, height: u32) -> String {
    let mut bytes = Vec::new();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 60]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode test photo");
    BASE64.encode(bytes)
}
