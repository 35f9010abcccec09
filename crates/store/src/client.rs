use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use packsight_auth::{AuthError, SessionHandle};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::types::{AggregateStats, DetectionEvent, RecordsPage};

/// Read contract of the telemetry store.
///
/// A `brand` of `None` reads across every brand.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// All detection events, optionally restricted to one brand.
    async fn scan(&self, brand: Option<&str>) -> Result<Vec<DetectionEvent>, StoreError>;

    /// Current aggregate snapshot.
    async fn aggregate_stats(&self, brand: Option<&str>) -> Result<AggregateStats, StoreError>;

    /// The most recent `limit` events.
    async fn recent_records(
        &self,
        brand: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DetectionEvent>, StoreError>;

    /// Events of `brand` with `start <= timestamp <= end`, in scan order.
    async fn query_by_time_range(
        &self,
        brand: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DetectionEvent>, StoreError> {
        let events = self.scan(Some(brand)).await?;
        Ok(filter_by_time_range(events, start, end))
    }
}

/// Keep the events whose timestamp lies in `[start, end]`, preserving order.
pub fn filter_by_time_range(
    events: Vec<DetectionEvent>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DetectionEvent> {
    events
        .into_iter()
        .filter(|event| start <= event.timestamp && event.timestamp <= end)
        .collect()
}

/// [`DetectionStore`] backed by the PackSight telemetry HTTP API.
///
/// Each request carries the bearer token of the current session.
pub struct HttpDetectionStore {
    base_url: String,
    http_client: Client,
    credentials: SessionHandle,
}

impl HttpDetectionStore {
    pub fn new(base_url: &str, http_client: Client, credentials: SessionHandle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StoreError> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(StoreError::Auth(AuthError::MissingToken))?;

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", path, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("GET {} failed with status {}", path, status);
            return Err(StoreError::NonSuccessStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::MalformedResponse(e.to_string()))
    }
}

fn brand_query(brand: Option<&str>) -> Vec<(&'static str, String)> {
    brand
        .map(|b| vec![("brand", b.to_string())])
        .unwrap_or_default()
}

fn validate_events(events: &[DetectionEvent]) -> Result<(), StoreError> {
    events
        .iter()
        .try_for_each(DetectionEvent::validate)
        .map_err(StoreError::MalformedResponse)
}

#[async_trait]
impl DetectionStore for HttpDetectionStore {
    async fn scan(&self, brand: Option<&str>) -> Result<Vec<DetectionEvent>, StoreError> {
        let events: Vec<DetectionEvent> = self.get_json("/scan-records", &brand_query(brand)).await?;
        validate_events(&events)?;
        Ok(events)
    }

    async fn aggregate_stats(&self, brand: Option<&str>) -> Result<AggregateStats, StoreError> {
        let stats: AggregateStats = self.get_json("/realtime/stats", &brand_query(brand)).await?;
        stats.validate().map_err(StoreError::MalformedResponse)?;
        Ok(stats)
    }

    async fn recent_records(
        &self,
        brand: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DetectionEvent>, StoreError> {
        let mut query = brand_query(brand);
        query.push(("limit", limit.to_string()));

        let page: RecordsPage = self.get_json("/realtime/records", &query).await?;
        validate_events(&page.records)?;
        Ok(page.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn event(id: &str, timestamp: DateTime<Utc>) -> DetectionEvent {
        DetectionEvent {
            id: id.to_string(),
            brand_name: "Pepsi".to_string(),
            material: "Aluminum Can".to_string(),
            image_ref: format!("/{}.jpg", id),
            confidence: BTreeMap::new(),
            timestamp,
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_time_range_is_inclusive_and_ordered() {
        let events = vec![
            event("late", at(12, 15)),
            event("start", at(10, 30)),
            event("before", at(10, 29)),
            event("end", at(11, 45)),
            event("middle", at(11, 0)),
        ];

        let ids: Vec<String> = filter_by_time_range(events, at(10, 30), at(11, 45))
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["start", "end", "middle"]);
    }

    #[test]
    fn test_time_range_compares_instants_not_strings() {
        // 11:00+02:00 is 09:00Z, before the window even though "11:00" sorts inside it
        let offset = chrono::DateTime::parse_from_rfc3339("2024-01-15T11:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        let events = vec![event("shifted", offset), event("inside", at(10, 45))];

        let kept = filter_by_time_range(events, at(10, 30), at(11, 45));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "inside");
    }

    #[test]
    fn test_empty_range() {
        let events = vec![event("a", at(10, 0))];
        assert!(filter_by_time_range(events, at(11, 0), at(10, 0)).is_empty());
    }

    #[test]
    fn test_brand_query() {
        assert!(brand_query(None).is_empty());
        assert_eq!(brand_query(Some("Coca-Cola")), vec![("brand", "Coca-Cola".to_string())]);
    }
}
