use chrono::{DateTime, Utc};

/// Observable state of a [`Poller`](crate::Poller).
#[derive(Debug, Clone, PartialEq)]
pub struct PollingState<T> {
    /// Result of the last successful fetch; kept when a later fetch fails
    pub data: Option<T>,
    /// A fetch of the current generation is in flight
    pub is_loading: bool,
    /// Message of the last failed fetch, cleared by the next success
    pub error: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for PollingState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            last_fetched_at: None,
        }
    }
}

impl<T> PollingState<T> {
    pub(crate) fn apply(&mut self, result: Result<T, String>) {
        self.is_loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.last_fetched_at = Some(Utc::now());
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
    }
}
