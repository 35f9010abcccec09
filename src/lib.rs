//! PackSight Rust Client Library
//!
//! A Rust client for the PackSight packaging analytics platform: OAuth2 sign-in
//! with brand-scoped sessions, access-checked reads of detection telemetry, and
//! polled live views that follow the signed-in user.
//!
//! ```no_run
//! # async fn run() -> Result<(), packsight::Error> {
//! use packsight::prelude::*;
//!
//! let client = PackSight::from_env()?;
//! if client.auth().restore_session().is_none() {
//!     println!("Sign in at {}", client.auth().authorization_url(AuthIntent::Login));
//!     return Ok(());
//! }
//!
//! let stats = client.store().own_stats().await?;
//! println!("{} detections", stats.total_detections);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod feeds;

use std::sync::Arc;

use log::debug;
use reqwest::Client;

pub use packsight_auth as auth;
pub use packsight_realtime as realtime;
pub use packsight_store as store;

use packsight_auth::{FileStorage, MemoryStorage, SessionManager, TokenStorage};
use packsight_realtime::Poller;
use packsight_store::{AggregateStats, DetectionEvent, HttpDetectionStore, ScopedStore};

pub use crate::config::Config;
pub use crate::error::Error;
use crate::feeds::FeedOptions;

/// The main entry point for the PackSight client
pub struct PackSight {
    config: Config,
    http_client: Client,
    auth: SessionManager,
    store: ScopedStore,
}

impl PackSight {
    /// Create a client, persisting tokens under `config.token_dir` when set
    /// and in memory otherwise.
    ///
    /// No session is restored; call
    /// [`SessionManager::restore_session`] through [`PackSight::auth`].
    pub fn new(config: Config) -> Result<Self, Error> {
        let storage: Arc<dyn TokenStorage> = match &config.token_dir {
            Some(dir) => Arc::new(FileStorage::new(dir.clone())),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, storage)
    }

    /// Create a client with custom token storage
    pub fn with_storage(config: Config, storage: Arc<dyn TokenStorage>) -> Result<Self, Error> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = SessionManager::with_http_client(config.auth.clone(), storage, http_client.clone());
        let http_store = HttpDetectionStore::new(&config.store_url, http_client.clone(), auth.handle());
        let store = ScopedStore::new(Arc::new(http_store), auth.handle());

        debug!("PackSight client created for store {}", config.store_url);
        Ok(Self {
            config,
            http_client,
            auth,
            store,
        })
    }

    /// Create a client from environment variables, see [`Config::from_env`]
    pub fn from_env() -> Result<Self, Error> {
        Self::new(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Sign-in, sign-out and the current session
    pub fn auth(&self) -> &SessionManager {
        &self.auth
    }

    /// Detection store reads, refused outside the session's brand
    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    /// Live view of the latest detection events, using the configured limit and refresh
    pub fn records_feed(&self) -> Poller<Vec<DetectionEvent>> {
        self.records_feed_with(FeedOptions {
            limit: self.config.records_limit,
            refresh_interval: self.config.records_refresh,
        })
    }

    /// # Panics
    ///
    /// Panics if `options.refresh_interval` is zero.
    pub fn records_feed_with(&self, options: FeedOptions) -> Poller<Vec<DetectionEvent>> {
        feeds::records_feed(&self.store, &self.auth.handle(), options)
    }

    /// Live view of the aggregate statistics
    pub fn stats_feed(&self) -> Poller<AggregateStats> {
        feeds::stats_feed(&self.store, &self.auth.handle(), self.config.stats_refresh)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::Error;
    pub use crate::feeds::FeedOptions;
    pub use crate::PackSight;
    pub use packsight_auth::{AuthConfig, AuthIntent, Role, Session};
    pub use packsight_realtime::{Poller, PollingState};
    pub use packsight_store::{AggregateStats, DetectionEvent, DetectionStore};
}
