use common::config::{IntegrityConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    1
}

/// Periodic re-verification of stale records.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    /// Default: false.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps. Default: 86400 (daily).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// A record is stale once its last verification is this old. Default: 7 days.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Maximum records verified per sweep. Default: 500.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u64,
}

fn default_interval_secs() -> u64 {
    86_400
}
fn default_stale_after_secs() -> u64 {
    7 * 86_400
}
fn default_batch_limit() -> u64 {
    500
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            batch_limit: default_batch_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("COLDSTORE_CONFIG").unwrap_or_else(|_| "config/config".into());
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Load from config/config.toml
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., COLDSTORE__DATABASE__URL)
            .add_source(Environment::with_prefix("COLDSTORE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
