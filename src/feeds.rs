//! Polled views over the detection store
//!
//! Each feed is a [`Poller`] that follows the session: it starts fetching when
//! someone signs in, stops on sign-out and starts over from an empty state
//! whenever the signed-in identity changes. Reads go through a [`ScopedStore`]
//! and use the session current at dispatch time, so a brand user only ever
//! polls their own brand and an admin polls every brand.
//!
//! Feeds spawn tasks and must be created inside a tokio runtime.

use std::time::Duration;

use packsight_auth::SessionHandle;
use packsight_realtime::Poller;
use packsight_store::{AggregateStats, DetectionEvent, ScopedStore};

use crate::config::{DEFAULT_RECORDS_LIMIT, DEFAULT_RECORDS_REFRESH};

/// Parameters of the records feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub limit: usize,
    pub refresh_interval: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECORDS_LIMIT,
            refresh_interval: DEFAULT_RECORDS_REFRESH,
        }
    }
}

/// The latest `options.limit` detection events visible to the session.
///
/// # Panics
///
/// Panics if `options.refresh_interval` is zero.
pub fn records_feed(
    store: &ScopedStore,
    session: &SessionHandle,
    options: FeedOptions,
) -> Poller<Vec<DetectionEvent>> {
    let store = store.clone();
    let limit = options.limit;
    let poller = Poller::new(options.refresh_interval, move || {
        let store = store.clone();
        async move { store.own_recent_records(limit).await }
    });
    poller.follow(session.subscribe(), Option::is_some);
    poller
}

/// Aggregate statistics visible to the session, refreshed every `refresh_interval`.
///
/// # Panics
///
/// Panics if `refresh_interval` is zero.
pub fn stats_feed(
    store: &ScopedStore,
    session: &SessionHandle,
    refresh_interval: Duration,
) -> Poller<AggregateStats> {
    let store = store.clone();
    let poller = Poller::new(refresh_interval, move || {
        let store = store.clone();
        async move { store.own_stats().await }
    });
    poller.follow(session.subscribe(), Option::is_some);
    poller
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_feed_options() {
        let options = FeedOptions::default();
        assert_eq!(options.limit, 10);
        assert_eq!(options.refresh_interval, Duration::from_secs(60));
    }
}
