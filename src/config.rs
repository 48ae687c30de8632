//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `INTERIORD_*` environment variables (nested keys split on `__`, e.g.
//! `INTERIORD_MODEL__BASE_URL`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file; None = in-memory
    pub db_path: Option<String>,
    /// "text" or "json"
    pub log_format: String,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            db_path: None,
            log_format: "text".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            model: ModelConfig::default(),
            generation: GenerationConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Diffusion backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7860".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Batch generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Side of the square canvas fed to the model
    pub canvas_size: u32,
    /// Inference steps per call
    pub steps: u32,
    /// Concurrent model calls; 0 = available parallelism
    pub max_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            canvas_size: 1024,
            steps: 75,
            max_concurrency: 3,
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            ttl_secs: 3600,
        }
    }
}

/// Account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt cost factor for new password hashes
    pub hash_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hash_cost: crate::auth::DEFAULT_HASH_COST,
        }
    }
}

impl Config {
    /// Load defaults, then `path` (if given), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("INTERIORD_").split("__"))
            .extract()
    }

    /// True when logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.db_path.is_none());
        assert_eq!(config.generation.canvas_size, 1024);
        assert_eq!(config.generation.steps, 75);
        assert_eq!(config.generation.max_concurrency, 3);
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.auth.hash_cost, 12);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_load_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "0.0.0.0:9000"
log_format = "json"

[model]
base_url = "http://gpu-box:7860"

[generation]
steps = 30
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.json_logs());
        assert_eq!(config.model.base_url, "http://gpu-box:7860");
        assert_eq!(config.model.timeout_secs, 300);
        assert_eq!(config.generation.steps, 30);
        assert_eq!(config.generation.canvas_size, 1024);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/interiord.toml"))).unwrap();
        assert_eq!(config.generation.steps, 75);
    }
}
