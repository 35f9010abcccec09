//! Error handling for the PackSight client

use std::fmt;
use thiserror::Error;

use packsight_auth::{AccessDenied, AuthError, StorageError, TokenExchangeError};
use packsight_store::StoreError;

/// Unified error type for the PackSight client
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to build or use the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    TokenExchange(#[from] TokenExchangeError),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }
}
