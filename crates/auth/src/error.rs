use thiserror::Error;

/// Errors raised while reading or decoding the signed-in identity.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing token: not signed in")]
    MissingToken,

    #[error("Failed to decode identity token: {0}")]
    DecodeFailure(String),

    #[error("Token exchange failed: {0}")]
    Exchange(#[from] TokenExchangeError),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by the authorization-code exchange.
#[derive(Error, Debug)]
pub enum TokenExchangeError {
    #[error("Token endpoint returned status {status}: {body}")]
    NonSuccessStatus { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to persist token bundle: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by a [`TokenStorage`](crate::storage::TokenStorage) backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A read was refused before any request was issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied to data for {}", .brand.as_deref().unwrap_or("all brands"))]
pub struct AccessDenied {
    /// The brand that was requested, `None` for an all-brands read.
    pub brand: Option<String>,
}

impl AccessDenied {
    pub fn new(brand: Option<&str>) -> Self {
        Self {
            brand: brand.map(str::to_string),
        }
    }
}
