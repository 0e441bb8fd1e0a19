//! Server configuration. The core only consumes the fields it needs - storage backends, default
//! backend, URL strategy, key generator choice, presign secret/expiry, admin toggle.
//! CORS/logging/health wiring stays in [`crate::bin`].

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::key_generator::KeyPolicy;
use crate::url_strategy::UrlStrategyKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub url: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    Fs,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BackendKind,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub url_prefix: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub use_path_style: bool,
    #[serde(default)]
    pub create_bucket_if_not_exist: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".into()
}

fn default_key_policy() -> KeyPolicy {
    KeyPolicy::Legacy
}

fn default_url_strategy() -> UrlStrategyKind {
    UrlStrategyKind::Content
}

fn default_api_prefix() -> String {
    "/api/v1".into()
}

fn default_presign_expires_seconds() -> i64 {
    900
}

fn default_url_expiry_seconds() -> i64 {
    1800
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    pub database: DatabaseConfig,
    pub backends: Vec<BackendConfig>,
    pub default_storage_backend: Option<String>,
    #[serde(default = "default_url_strategy")]
    pub url_strategy: UrlStrategyKind,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_key_policy")]
    pub key_policy: KeyPolicy,
    pub presign_secret: String,
    #[serde(default = "default_presign_expires_seconds")]
    pub presign_expires_seconds: i64,
    #[serde(default = "default_url_expiry_seconds")]
    pub url_expiry_seconds: i64,
    #[serde(default)]
    pub admin_enabled: bool,
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    /// Loads from `<config_path>.{toml,yaml,json,..}` overlaid with `CONTENT_*`
    /// environment variables.
    pub fn load(config_path: &str) -> Result<Self, config::ConfigError> {
        let built = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("CONTENT").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_environment_only() {
        std::env::set_var("CONTENT_DATABASE__TYPE", "memory");
        std::env::set_var("CONTENT_PRESIGN_SECRET", "test-secret");
        std::env::set_var("CONTENT_BACKENDS", "[]");

        let settings = Settings::load("config/nonexistent").expect("env-only settings should load");
        assert_eq!(settings.presign_secret, "test-secret");
        assert!(matches!(settings.database.kind, DatabaseKind::Memory));

        std::env::remove_var("CONTENT_DATABASE__TYPE");
        std::env::remove_var("CONTENT_PRESIGN_SECRET");
        std::env::remove_var("CONTENT_BACKENDS");
    }
}
