//! Error taxonomy for the viewer core.

use crate::session::Capability;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// Marker type outside the fixed kind set. Never defaulted.
    #[error("invalid marker type '{0}' (expected house, trader, tower, tent, safezone or infrastructure)")]
    InvalidKind(String),

    #[error("login required")]
    AuthRequired,

    #[error("permission denied: {capability}")]
    Permission { capability: Capability },

    /// Startup fetch of a public resource failed. Callers degrade to empty.
    #[error("resource '{resource}' unavailable: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ViewerError {
    /// True for errors that should prompt the user again rather than abort.
    pub fn is_retryable_input(&self) -> bool {
        matches!(self, Self::InvalidKind(_) | Self::MalformedInput(_))
    }
}
