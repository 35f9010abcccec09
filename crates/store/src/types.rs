//! Telemetry records as served by the store

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single brand/material recognition observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub id: String,

    #[serde(rename = "name")]
    pub brand_name: String,

    pub material: String,

    #[serde(rename = "imageUrl")]
    pub image_ref: String,

    /// Metric name to score, each in `[0, 1]`
    pub confidence: BTreeMap<String, f64>,

    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    pub fn confidence_for(&self, metric: &str) -> Option<f64> {
        self.confidence.get(metric).copied()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for (metric, score) in &self.confidence {
            if !is_unit_score(*score) {
                return Err(format!(
                    "event {}: confidence {} = {} is outside [0, 1]",
                    self.id, metric, score
                ));
            }
        }
        Ok(())
    }
}

/// Detection count for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCount {
    pub material: String,
    pub count: u64,
}

/// Point-in-time summary of detection activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_detections: u64,
    pub avg_confidence: f64,
    pub recent_activity: u64,
    /// Ordered by the store, most detected first
    pub top_materials: Vec<MaterialCount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl AggregateStats {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !is_unit_score(self.avg_confidence) {
            return Err(format!(
                "avgConfidence {} is outside [0, 1]",
                self.avg_confidence
            ));
        }
        Ok(())
    }
}

/// Body of `GET /realtime/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsPage {
    pub records: Vec<DetectionEvent>,
}

fn is_unit_score(score: f64) -> bool {
    (0.0..=1.0).contains(&score)
}
