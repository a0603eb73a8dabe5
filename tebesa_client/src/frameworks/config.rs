use std::path::{Path, PathBuf};
use std::{env, fs, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_CONFIG_PATH: &str = "tebesa.toml";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:4000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1500;

// Conversation partner the demo session chats with.
pub const DEMO_MATCH_ID: &str = "match123";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

// Which backend implementation the context is wired with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    #[default]
    InMemory,
    Http {
        identity_url: String,
        store_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub app_id: String,
    // Externally supplied token exchanged for an identity at startup.
    pub bootstrap_token: Option<String>,
    pub backend: BackendConfig,
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            bootstrap_token: None,
            backend: BackendConfig::InMemory,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    // `.env`, then the TOML file, then `TEBESA_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env locally; safe to ignore when not present.
        let _ = dotenvy::dotenv();

        let explicit = env::var("TEBESA_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));
        let config = if explicit.is_some() || path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(app_id) = lookup("TEBESA_APP_ID") {
            self.app_id = app_id;
        }
        if let Some(token) = lookup("TEBESA_INITIAL_AUTH_TOKEN") {
            self.bootstrap_token = Some(token);
        }
        if let Some(value) = lookup("TEBESA_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = value.parse().map_err(|_| ConfigError::Invalid {
                key: "TEBESA_REQUEST_TIMEOUT_MS",
                value,
            })?;
        }

        let identity_override = lookup("TEBESA_IDENTITY_URL");
        let store_override = lookup("TEBESA_STORE_URL");
        if identity_override.is_some() || store_override.is_some() {
            // Either URL alone switches to HTTP; the other keeps its configured value.
            let (identity_url, store_url) = match self.backend {
                BackendConfig::Http {
                    identity_url,
                    store_url,
                } => (identity_url, store_url),
                BackendConfig::InMemory => {
                    (DEFAULT_BACKEND_URL.to_string(), DEFAULT_BACKEND_URL.to_string())
                }
            };
            self.backend = BackendConfig::Http {
                identity_url: identity_override.unwrap_or(identity_url),
                store_url: store_override.unwrap_or(store_url),
            };
        }

        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
