use chrono::{DateTime, Duration, NaiveDate, Utc};
use core::fmt;
use log::{info, warn};

use crate::client::{SourceClient, SourceClientError};
use crate::models::sensor::{Metric, RangeQuery, RawReading, ValidationError};

/// Anything that can answer a raw range query; the HTTP client in production.
pub trait RawSource {
    fn query(&self, query: &RangeQuery) -> Result<Vec<RawReading>, SourceClientError>;
}

impl RawSource for SourceClient {
    fn query(&self, query: &RangeQuery) -> Result<Vec<RawReading>, SourceClientError> {
        self.get_sensor_data(query)
    }
}

#[derive(Debug)]
pub enum ExtractError {
    Query(ValidationError),
    Transport(SourceClientError),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Query(e) => write!(f, "build range query: {}", e),
            ExtractError::Transport(e) => write!(f, "fetch raw readings: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Query(e) => Some(e),
            ExtractError::Transport(e) => Some(e),
        }
    }
}

impl From<SourceClientError> for ExtractError {
    fn from(value: SourceClientError) -> Self {
        ExtractError::Transport(value)
    }
}

/// `[00:00:00, 23:59:59]` UTC of `day`, both ends inclusive.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::seconds(86_400 - 1))
}

/// Fetch every raw reading of `day`, optionally restricted to `metrics`.
pub fn extract_day<S: RawSource + ?Sized>(
    source: &S,
    day: NaiveDate,
    metrics: Option<&[Metric]>,
) -> Result<Vec<RawReading>, ExtractError> {
    let (start, end) = day_window(day);
    let query = RangeQuery::new(start, end, metrics.map(<[Metric]>::to_vec)).map_err(ExtractError::Query)?;

    let readings = source.query(&query)?;
    if readings.is_empty() {
        warn!("Extract: no readings for {}", day);
    } else {
        info!("Extract: fetched {} reading(s) for {}", readings.len(), day);
    }
    Ok(readings)
}
