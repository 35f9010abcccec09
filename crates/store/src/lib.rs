//! PackSight detection store client for Rust
//!
//! This crate reads packaging-detection telemetry (individual detection events
//! and aggregate statistics) from the PackSight telemetry API. Reads go through
//! the [`DetectionStore`] trait; [`HttpDetectionStore`] talks to the API and
//! [`ScopedStore`] refuses reads outside the signed-in user's brand before any
//! request is made.

mod client;
mod error;
mod scoped;
mod types;

pub use client::{filter_by_time_range, DetectionStore, HttpDetectionStore};
pub use error::StoreError;
pub use scoped::ScopedStore;
pub use types::{AggregateStats, DetectionEvent, MaterialCount, RecordsPage};
