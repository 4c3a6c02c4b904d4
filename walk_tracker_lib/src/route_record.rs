use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;

/// A finished walk. Field names on disk match what the app has always stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteRecord {
    pub id: i64,
    pub date: DateTime<Utc>,
    /// Kilometres with two fraction digits, e.g. `"1.27"`.
    #[serde(rename = "distance")]
    pub distance_km: String,
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "route")]
    pub path: Vec<Coordinate>,
}

impl RouteRecord {
    pub fn new(id: i64, date: DateTime<Utc>, distance_km: f64, duration_seconds: u64, path: Vec<Coordinate>) -> Self {
        Self {
            id,
            date,
            distance_km: format_km(distance_km),
            duration_seconds,
            path,
        }
    }

    /// Parsed distance. Records with a garbled distance count as zero.
    pub fn kilometres(&self) -> f64 {
        self.distance_km.trim().parse().unwrap_or(0.0)
    }
}

pub fn format_km(km: f64) -> String {
    format!("{:.2}", km)
}
