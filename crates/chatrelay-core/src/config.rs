//! Runtime configuration, read from the environment.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_VECTOR_STORE_NAME: &str = "vs-vercel-ui-responses-api-example";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// Top-level chatrelay configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Listen address.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Bearer token for the hosted provider.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Provider API root, without a trailing slash.
    pub base_url: String,
    /// Model used for every chat turn.
    pub model: String,
    /// Name of the vector store that uploaded files are registered with.
    pub vector_store_name: String,
    /// Maximum accepted multipart body, in bytes.
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("vector_store_name", &self.vector_store_name)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl RelayConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".into()))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let max_upload_mb = match lookup("CHATRELAY_MAX_UPLOAD_MB") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid CHATRELAY_MAX_UPLOAD_MB={}", raw);
                DEFAULT_MAX_UPLOAD_MB
            }),
            None => DEFAULT_MAX_UPLOAD_MB,
        };
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            Error::Config(format!("CHATRELAY_MAX_UPLOAD_MB too large: {}", max_upload_mb))
        })?;

        let base_url = lookup("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            api_key,
            base_url,
            model: lookup("CHATRELAY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            vector_store_name: lookup("CHATRELAY_VECTOR_STORE")
                .unwrap_or_else(|| DEFAULT_VECTOR_STORE_NAME.into()),
            max_upload_bytes,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
