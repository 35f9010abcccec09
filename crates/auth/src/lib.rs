//! PackSight Auth client for Rust
//!
//! This crate provides the sign-in side of PackSight: building the hosted
//! login/signup/logout redirects, exchanging an authorization code for a
//! token bundle, persisting that bundle, and decoding it into a brand-scoped
//! [`Session`] that the rest of the workspace can read and subscribe to.
//!
//! Identity tokens are decoded without verifying their signature. The bundle is
//! trusted because it was obtained over the direct token-endpoint exchange;
//! callers that need stronger guarantees must verify tokens against the
//! provider's published keys themselves.

pub mod access;
mod config;
mod error;
mod manager;
mod session;
pub mod storage;

pub use access::{can_access_brand, ensure_brand_access};
pub use config::{AuthConfig, AuthIntent, DEFAULT_SCOPES, DEFAULT_STORAGE_KEY};
pub use error::{AccessDenied, AuthError, StorageError, TokenExchangeError};
pub use manager::{SessionHandle, SessionManager};
pub use session::{
    decode_claims, decode_session, IdTokenClaims, Role, Session, TokenBundle, TokenResponse,
    ADMIN_GROUP, UNKNOWN_BRAND,
};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
