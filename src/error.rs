//! Error types and result aliases for the http-spy library.
//!
//! This module defines the core error type [`HttpSpyError`] and the [`Result`] type alias.
//! Only construction-time surfaces (configuration, pattern compilation) and the
//! instrumented transport return errors. Observer callbacks never do: every failure
//! inside the tap is swallowed so it cannot reach the host's request path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpSpyError {
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Body decode error: {0}")]
    BodyDecodeError(String),
}

pub type Result<T> = std::result::Result<T, HttpSpyError>;
