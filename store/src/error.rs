//! Error types for schema store operations.

use thiserror::Error;

/// Errors that can occur while loading, verifying, or configuring a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The manifest is malformed or lists a document the store lacks.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A stored document does not match its recorded checksum.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Every configured source failed to load.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
