//! chatrelay core — configuration and the shared error type.

pub mod config;
pub mod error;

pub use config::RelayConfig;
pub use error::{Error, Result};
