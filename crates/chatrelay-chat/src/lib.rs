//! Relay to a hosted language-model provider.
//!
//! Streams model responses as decoded events and manages the provider's
//! file store and named vector store. Nothing runs locally; every call
//! goes to the external API.

pub mod providers;
pub mod sse;
pub mod types;
pub mod vector_store;

pub use providers::{EventStream, FileService, ModelService, OpenAiClient};
pub use types::*;
pub use vector_store::ensure_vector_store;
