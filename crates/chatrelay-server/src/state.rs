//! Shared application state.

use std::sync::Arc;

use chatrelay_chat::{FileService, ModelService, OpenAiClient};
use chatrelay_core::{RelayConfig, Result};

/// Shared application state accessible from all route handlers.
///
/// Built once at startup and never mutated; the provider is the only
/// place any state outlives a request.
pub struct AppState {
    pub config: RelayConfig,
    pub model: Arc<dyn ModelService>,
    pub files: Arc<dyn FileService>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        model: Arc<dyn ModelService>,
        files: Arc<dyn FileService>,
    ) -> Self {
        Self { config, model, files }
    }

    /// Wire both relays to one OpenAI client.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::from_config(&config)?);
        Ok(Self::new(config, client.clone(), client))
    }
}
