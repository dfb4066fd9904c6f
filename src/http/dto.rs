//! Request and response bodies of the source API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::NewSensorRow;
use crate::models::sensor::deserialize_instant;
use crate::services::seed::SeedSummary;

pub const DEFAULT_SEED_DAYS: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRequest {
    #[serde(deserialize_with = "deserialize_instant")]
    pub start_date: DateTime<Utc>,
    #[serde(default = "default_seed_days")]
    pub days: i64,
}

fn default_seed_days() -> i64 {
    DEFAULT_SEED_DAYS
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub details: SeedSummary,
}

/// Body of `POST /api/v1/sensors`; metrics may be omitted or null.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReadingRequest {
    #[serde(deserialize_with = "deserialize_instant")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub ambient_temperature: Option<f64>,
}

impl From<NewReadingRequest> for NewSensorRow {
    fn from(req: NewReadingRequest) -> Self {
        NewSensorRow {
            timestamp: req.timestamp,
            wind_speed: req.wind_speed,
            power: req.power,
            ambient_temperature: req.ambient_temperature,
        }
    }
}
