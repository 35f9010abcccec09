use packsight_auth::{AccessDenied, AuthError};
use thiserror::Error;

/// Errors returned by every telemetry read.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Telemetry store unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Telemetry store returned status {status}: {body}")]
    NonSuccessStatus { status: u16, body: String },

    #[error("Malformed telemetry response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl StoreError {
    /// Whether the request never reached the network.
    pub fn is_rejected_locally(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::Auth(_))
    }
}
