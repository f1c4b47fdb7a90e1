//! Errors for keyseq

use thiserror::Error;

/// Configuration errors raised when a matcher cannot be built
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("sequence must contain at least one key")]
    EmptySequence,
    #[error("no sequence defined for '{name}'")]
    MissingSequence { name: String },
    #[error("invalid key '{token}' in sequence '{name}'")]
    InvalidKey { name: String, token: String },
    #[error("invalid timeout '{value}' for sequence '{name}'")]
    InvalidTimeout { name: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
