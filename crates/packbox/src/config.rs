//! Configuration types for resolution and installation

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::core::{PackboxError, Result};

pub const DEFAULT_MODRINTH_URL: &str = "https://api.modrinth.com/v2";
pub const DEFAULT_CURSEFORGE_URL: &str = "https://api.curseforge.com/v1";

/// Configuration shared by the registry clients and the installer
#[derive(Debug, Clone)]
pub struct PackboxConfig {
    pub user_agent: String,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout: Option<Duration>,
    pub modrinth_url: String,
    pub curseforge_url: String,
    pub curseforge_api_key: Option<String>,
    /// Number of progress callbacks per file (one every `total / progress_steps` bytes)
    pub progress_steps: u64,
    /// Expected size substituted for pacing when the server sends no length
    pub default_total_size: u64,
    /// Read buffer size used when computing file digests
    pub digest_chunk_size: usize,
    /// Files resolved or installed at once; 1 keeps the run strictly sequential
    pub max_concurrent: usize,
}

impl Default for PackboxConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("packbox/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
            modrinth_url: DEFAULT_MODRINTH_URL.to_string(),
            curseforge_url: DEFAULT_CURSEFORGE_URL.to_string(),
            curseforge_api_key: None,
            progress_steps: 50,
            default_total_size: 1_000_000,
            digest_chunk_size: 8 * 1024,
            max_concurrent: 1,
        }
    }
}

impl PackboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the process environment, loading `.env` first
    ///
    /// Recognized variables: `PACKBOX_MODRINTH_URL`, `PACKBOX_CURSEFORGE_URL`,
    /// `CURSEFORGE_API_KEY`, `PACKBOX_MAX_CONCURRENT`, `PACKBOX_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Ignore error if .env not present

        let mut config = Self::default();
        if let Ok(url) = std::env::var("PACKBOX_MODRINTH_URL") {
            config.modrinth_url = url;
        }
        if let Ok(url) = std::env::var("PACKBOX_CURSEFORGE_URL") {
            config.curseforge_url = url;
        }
        if let Ok(key) = std::env::var("CURSEFORGE_API_KEY") {
            if !key.trim().is_empty() {
                config.curseforge_api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(value) = std::env::var("PACKBOX_MAX_CONCURRENT") {
            config.max_concurrent = parse_env_number("PACKBOX_MAX_CONCURRENT", &value)?;
        }
        if let Ok(value) = std::env::var("PACKBOX_TIMEOUT_SECS") {
            let secs: u64 = parse_env_number("PACKBOX_TIMEOUT_SECS", &value)?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        debug!("Loaded configuration: modrinth={}, curseforge={}, max_concurrent={}",
               config.modrinth_url, config.curseforge_url, config.max_concurrent);
        Ok(config)
    }

    pub fn with_modrinth_url<S: Into<String>>(mut self, url: S) -> Self {
        self.modrinth_url = url.into();
        self
    }

    pub fn with_curseforge_url<S: Into<String>>(mut self, url: S) -> Self {
        self.curseforge_url = url.into();
        self
    }

    pub fn with_curseforge_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.curseforge_api_key = Some(key.into());
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Build an HTTP client honoring the user agent and timeout settings
    pub fn http_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| PackboxError::Configuration {
            message: format!("failed to create HTTP client: {}", e),
            field: None,
        })
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| PackboxError::Configuration {
        message: format!("{} must be a positive number, got '{}'", name, value),
        field: Some(name.to_string()),
    })
}

/// Validate a base URL and strip any trailing slash so paths can be appended
pub(crate) fn normalize_base_url(base: &str) -> Result<String> {
    url::Url::parse(base).map_err(|source| PackboxError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    Ok(base.trim_end_matches('/').to_string())
}
