//! Configuration for the PackSight client

use std::path::PathBuf;
use std::time::Duration;

use packsight_auth::AuthConfig;
use url::Url;

use crate::error::Error;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECORDS_LIMIT: usize = 10;
pub const DEFAULT_RECORDS_REFRESH: Duration = Duration::from_secs(60);
pub const DEFAULT_STATS_REFRESH: Duration = Duration::from_secs(30);

/// Configuration for [`PackSight`](crate::PackSight)
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity-provider settings
    pub auth: AuthConfig,

    /// Base URL of the telemetry API
    pub store_url: String,

    /// Directory holding the persisted token bundle; in memory when `None`
    pub token_dir: Option<PathBuf>,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Number of events shown by the records feed
    pub records_limit: usize,

    pub records_refresh: Duration,

    pub stats_refresh: Duration,
}

impl Config {
    pub fn new(auth: AuthConfig, store_url: impl Into<String>) -> Self {
        Self {
            auth,
            store_url: store_url.into(),
            token_dir: None,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            records_limit: DEFAULT_RECORDS_LIMIT,
            records_refresh: DEFAULT_RECORDS_REFRESH,
            stats_refresh: DEFAULT_STATS_REFRESH,
        }
    }

    /// Read the configuration from `COGNITO_*` and `PACKSIGHT_*` environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require =
            |name: &str| get(name).ok_or_else(|| Error::config(format!("{} is not set", name)));

        let domain = require("COGNITO_DOMAIN")?;
        let client_id = require("COGNITO_CLIENT_ID")?;
        let redirect_uri = require("COGNITO_REDIRECT_URI")?;
        let store_url = require("PACKSIGHT_STORE_URL")?;

        Url::parse(&domain)?;
        Url::parse(&redirect_uri)?;
        Url::parse(&store_url)?;

        let mut auth = AuthConfig::new(domain, client_id, redirect_uri)
            .with_client_secret(get("COGNITO_CLIENT_SECRET"));
        if let Some(logout_uri) = get("COGNITO_LOGOUT_URI") {
            auth = auth.with_logout_uri(logout_uri);
        }

        let mut config = Self::new(auth, store_url);
        config.token_dir = get("PACKSIGHT_TOKEN_DIR").map(PathBuf::from);
        Ok(config)
    }

    /// Persist the token bundle under `dir`
    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = Some(dir.into());
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_records_limit(mut self, value: usize) -> Self {
        self.records_limit = value;
        self
    }

    /// Must be non-zero, checked by [`Config::validate`]
    pub fn with_records_refresh(mut self, value: Duration) -> Self {
        self.records_refresh = value;
        self
    }

    /// Must be non-zero, checked by [`Config::validate`]
    pub fn with_stats_refresh(mut self, value: Duration) -> Self {
        self.stats_refresh = value;
        self
    }

    /// Reject settings the feeds cannot run with.
    ///
    /// [`PackSight`](crate::PackSight) calls this when it is created.
    pub fn validate(&self) -> Result<(), Error> {
        if self.records_refresh.is_zero() {
            return Err(Error::config("records refresh interval must be non-zero"));
        }
        if self.stats_refresh.is_zero() {
            return Err(Error::config("stats refresh interval must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("COGNITO_DOMAIN", "https://auth.packsight.example"),
        ("COGNITO_CLIENT_ID", "client-123"),
        ("COGNITO_REDIRECT_URI", "https://app.packsight.example/callback"),
        ("PACKSIGHT_STORE_URL", "https://api.packsight.example"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.auth.client_id(), "client-123");
        assert_eq!(config.auth.client_secret(), None);
        assert_eq!(config.auth.logout_uri(), "https://app.packsight.example/callback");
        assert_eq!(config.store_url, "https://api.packsight.example");
        assert_eq!(config.token_dir, None);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.records_limit, 10);
        assert_eq!(config.records_refresh, Duration::from_secs(60));
        assert_eq!(config.stats_refresh, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("COGNITO_CLIENT_SECRET", "shh"));
        vars.push(("COGNITO_LOGOUT_URI", "https://app.packsight.example/"));
        vars.push(("PACKSIGHT_TOKEN_DIR", "/var/lib/packsight"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.auth.client_secret(), Some("shh"));
        assert_eq!(config.auth.logout_uri(), "https://app.packsight.example/");
        assert_eq!(config.token_dir, Some(PathBuf::from("/var/lib/packsight")));
    }

    #[test]
    fn test_from_lookup_missing_or_blank() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "COGNITO_CLIENT_ID")
            .collect();
        match Config::from_lookup(lookup(&vars)) {
            Err(Error::Config(msg)) => assert!(msg.contains("COGNITO_CLIENT_ID")),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut vars = REQUIRED.to_vec();
        vars[3] = ("PACKSIGHT_STORE_URL", "  ");
        match Config::from_lookup(lookup(&vars)) {
            Err(Error::Config(msg)) => assert!(msg.contains("PACKSIGHT_STORE_URL")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_lookup_rejects_invalid_url() {
        let mut vars = REQUIRED.to_vec();
        vars[3] = ("PACKSIGHT_STORE_URL", "not a url");
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(Error::Url(_))
        ));
    }

    #[test]
    fn test_zero_refresh_is_rejected() {
        let auth = AuthConfig::new("https://auth.example.com", "c", "https://app.example.com/cb");
        let config = Config::new(auth, "https://api.example.com");
        assert!(config.validate().is_ok());

        let zero_records = config.clone().with_records_refresh(Duration::ZERO);
        match zero_records.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains("records")),
            other => panic!("unexpected result: {other:?}"),
        }
        let zero_stats = config.with_stats_refresh(Duration::ZERO);
        match zero_stats.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains("stats")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_builders() {
        let auth = AuthConfig::new("https://auth.example.com", "c", "https://app.example.com/cb");
        let config = Config::new(auth, "https://api.example.com")
            .with_token_dir("/tmp/tokens")
            .with_request_timeout(None)
            .with_records_limit(25)
            .with_records_refresh(Duration::from_secs(5))
            .with_stats_refresh(Duration::from_secs(2));

        assert_eq!(config.token_dir, Some(PathBuf::from("/tmp/tokens")));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.records_limit, 25);
        assert_eq!(config.records_refresh, Duration::from_secs(5));
        assert_eq!(config.stats_refresh, Duration::from_secs(2));
    }
}
