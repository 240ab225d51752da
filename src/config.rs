//! Environment-driven configuration.
//!
//! The client side needs the sharing API base URL and the page that shareable
//! links point at. The development hub needs a bind address, a sled path and
//! a size limit.

use crate::error::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_APP_URL: &str = "http://localhost:8000/lab/index.html";
pub const DEFAULT_HUB_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_HUB_DB_PATH: &str = ".everywhere_hub";
pub const DEFAULT_MAX_NOTEBOOK_BYTES: usize = 5 * 1024 * 1024;

/// Settings for talking to the sharing service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the sharing API, without trailing slash.
    pub api_url: String,
    /// Notebook page that `?notebook=<id>` links are built on.
    pub app_url: Url,
}

impl Config {
    pub fn new(api_url: &str, app_url: &str) -> Result<Self, ConfigError> {
        Url::parse(api_url).map_err(|source| ConfigError::InvalidUrl {
            var: "SHARING_SERVICE_API_URL",
            source,
        })?;
        let app_url = Url::parse(app_url).map_err(|source| ConfigError::InvalidUrl {
            var: "EVERYWHERE_APP_URL",
            source,
        })?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            app_url,
        })
    }

    /// Read `SHARING_SERVICE_API_URL` and `EVERYWHERE_APP_URL`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = non_empty_var("SHARING_SERVICE_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let app_url =
            non_empty_var("EVERYWHERE_APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string());
        Self::new(&api_url, &app_url)
    }
}

/// Settings for the local development hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub max_notebook_bytes: usize,
    /// Domain id stamped on every record this hub serves.
    pub domain_id: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: PathBuf::from(DEFAULT_HUB_DB_PATH),
            max_notebook_bytes: DEFAULT_MAX_NOTEBOOK_BYTES,
            domain_id: "local".to_string(),
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind) = non_empty_var("HUB_BIND") {
            config.bind = bind.parse().map_err(|_| ConfigError::InvalidValue {
                var: "HUB_BIND",
                value: bind.clone(),
            })?;
        }
        if let Some(path) = non_empty_var("HUB_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(limit) = non_empty_var("HUB_MAX_NOTEBOOK_BYTES") {
            config.max_notebook_bytes = limit.parse().map_err(|_| ConfigError::InvalidValue {
                var: "HUB_MAX_NOTEBOOK_BYTES",
                value: limit.clone(),
            })?;
        }

        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
