//! Polling data fetcher for PackSight views
//!
//! A [`Poller`] keeps a value fresh by re-running a fetch on a fixed period
//! while it is active. Results are published through a
//! [`watch`](tokio::sync::watch) channel as a [`PollingState`], and a result
//! is applied only if it belongs to the most recently dispatched fetch.

mod poller;
mod state;

pub use poller::Poller;
pub use state::PollingState;
