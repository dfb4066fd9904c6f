//! Wire-level types shared by the source service and the ETL.
//!
//! Notes
//! - `Metric` and `Statistic` are closed sets; anything else is rejected at the
//!   boundary with a `ValidationError`.
//! - `RawReading` keeps the flat JSON shape of the source API (`timestamp` plus
//!   one key per metric) and tolerates unknown keys.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

// =====================
// Validation errors
// =====================

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Calendar day not in `YYYY-MM-DD` form
    InvalidDate(String),
    /// Instant that is neither RFC 3339 nor a naive ISO-8601 date-time
    InvalidTimestamp { field: &'static str, value: String },
    MissingField(&'static str),
    UnknownMetric(String),
    /// Range whose end lies before its start
    InvertedRange { start: DateTime<Utc>, end: DateTime<Utc> },
    InvalidDays(i64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDate(v) => write!(f, "invalid date {:?}: expected YYYY-MM-DD", v),
            ValidationError::InvalidTimestamp { field, value } => {
                write!(f, "{} is not a valid timestamp: {:?}", field, value)
            }
            ValidationError::MissingField(field) => write!(f, "missing required parameter {}", field),
            ValidationError::UnknownMetric(m) => write!(
                f,
                "unknown metric {:?} (expected one of: {})",
                m,
                Metric::ALL.map(|m| m.as_str()).join(", ")
            ),
            ValidationError::InvertedRange { start, end } => {
                write!(f, "start_date ({}) must not be after end_date ({})", start, end)
            }
            ValidationError::InvalidDays(d) => write!(f, "days must be between 1 and {}, got {}", MAX_SEED_DAYS, d),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Upper bound on a single seeding request.
pub const MAX_SEED_DAYS: i64 = 366;

// =====================
// Metrics and statistics
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WindSpeed,
    Power,
    AmbientTemperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::WindSpeed, Metric::Power, Metric::AmbientTemperature];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::WindSpeed => "wind_speed",
            Metric::Power => "power",
            Metric::AmbientTemperature => "ambient_temperature",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    Mean,
    Min,
    Max,
    /// Sample standard deviation (n - 1 denominator)
    Std,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [Statistic::Mean, Statistic::Min, Statistic::Max, Statistic::Std];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Std => "std",
        }
    }
}

impl Display for Statistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry name of the aggregate series for `metric` and `statistic`, e.g. `power_mean`.
pub fn signal_name(metric: Metric, statistic: Statistic) -> String {
    format!("{}_{}", metric.as_str(), statistic.as_str())
}

/// Parse a comma-separated metric list, dropping duplicates.
pub fn parse_metric_list(raw: &str) -> Result<Vec<Metric>, ValidationError> {
    let mut metrics = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Metric::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    metrics.sort_unstable();
    metrics.dedup();
    Ok(metrics)
}

// =====================
// Dates and instants
// =====================

pub fn parse_day(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Accepts RFC 3339 (`2024-01-01T10:00:00Z`, `…+02:00`) or a naive date-time,
/// which is taken as UTC.
pub fn parse_instant(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidTimestamp {
            field,
            value: raw.to_string(),
        })
}

/// Serde adapter for instants that may arrive without an offset.
pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant("timestamp", &raw).map_err(serde::de::Error::custom)
}

// =====================
// Range query
// =====================

/// Validated time-window query against the raw store. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    metrics: Option<Vec<Metric>>,
}

impl RangeQuery {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metrics: Option<Vec<Metric>>,
    ) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        let metrics = metrics.filter(|m| !m.is_empty()).map(|mut m| {
            m.sort_unstable();
            m.dedup();
            m
        });
        Ok(RangeQuery { start, end, metrics })
    }

    /// Build from decoded query-string pairs. `metrics` may repeat and each
    /// value may itself be a comma-separated list; unrelated keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ValidationError> {
        let mut start = None;
        let mut end = None;
        let mut metrics: Option<Vec<Metric>> = None;
        for (key, value) in pairs {
            match key.as_str() {
                "start_date" => start = Some(parse_instant("start_date", value)?),
                "end_date" => end = Some(parse_instant("end_date", value)?),
                "metrics" => metrics.get_or_insert_with(Vec::new).extend(parse_metric_list(value)?),
                _ => {}
            }
        }
        let start = start.ok_or(ValidationError::MissingField("start_date"))?;
        let end = end.ok_or(ValidationError::MissingField("end_date"))?;
        RangeQuery::new(start, end, metrics)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `None` means every tracked metric.
    pub fn metrics(&self) -> Option<&[Metric]> {
        self.metrics.as_deref()
    }
}

// =====================
// Raw reading
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(deserialize_with = "deserialize_instant")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl RawReading {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        RawReading {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, metric: Metric, value: impl Into<Option<f64>>) -> Self {
        self.set(metric, value.into());
        self
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let json = value.map(Value::from).unwrap_or(Value::Null);
        self.fields.insert(metric.as_str().to_string(), json);
    }

    /// Numeric value of `metric`; null, missing and non-numeric count as absent.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.fields.get(metric.as_str()).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn signal_names_are_metric_then_statistic() {
        assert_eq!(signal_name(Metric::WindSpeed, Statistic::Mean), "wind_speed_mean");
        assert_eq!(
            signal_name(Metric::AmbientTemperature, Statistic::Std),
            "ambient_temperature_std"
        );
        let all: Vec<String> = Metric::ALL
            .iter()
            .flat_map(|m| Statistic::ALL.iter().map(move |s| signal_name(*m, *s)))
            .collect();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn metric_allow_list_rejects_unknown_names() {
        assert_eq!("power".parse::<Metric>(), Ok(Metric::Power));
        assert_eq!(
            "id".parse::<Metric>(),
            Err(ValidationError::UnknownMetric("id".to_string()))
        );
        assert!(parse_metric_list("power,__class__").is_err());
        assert_eq!(
            parse_metric_list("power, wind_speed,power").unwrap(),
            vec![Metric::WindSpeed, Metric::Power]
        );
    }

    #[test]
    fn instants_accept_offsets_and_naive_values() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_instant("t", "2024-03-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_instant("t", "2024-03-01T12:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_instant("t", "2024-03-01T10:00:00").unwrap(), expected);
        assert!(parse_instant("t", "yesterday").is_err());
    }

    #[test]
    fn day_parsing_requires_iso_format() {
        assert_eq!(parse_day("2024-02-29").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(matches!(parse_day("29/02/2024"), Err(ValidationError::InvalidDate(_))));
        assert!(parse_day("2023-02-29").is_err());
    }

    #[test]
    fn range_query_from_pairs() {
        let q = RangeQuery::from_pairs(&pairs(&[
            ("start_date", "2024-01-01T00:00:00Z"),
            ("end_date", "2024-01-01T23:59:59Z"),
            ("metrics", "power"),
            ("metrics", "wind_speed"),
            ("page", "3"),
        ]))
        .unwrap();
        assert_eq!(q.metrics(), Some(&[Metric::WindSpeed, Metric::Power][..]));

        let all = RangeQuery::from_pairs(&pairs(&[
            ("start_date", "2024-01-01T00:00:00Z"),
            ("end_date", "2024-01-02T00:00:00Z"),
        ]))
        .unwrap();
        assert_eq!(all.metrics(), None);
    }

    #[test]
    fn range_query_rejects_bad_input() {
        let inverted = RangeQuery::from_pairs(&pairs(&[
            ("start_date", "2024-01-02T00:00:00Z"),
            ("end_date", "2024-01-01T00:00:00Z"),
        ]));
        assert!(matches!(inverted, Err(ValidationError::InvertedRange { .. })));

        let missing = RangeQuery::from_pairs(&pairs(&[("start_date", "2024-01-02T00:00:00Z")]));
        assert_eq!(missing, Err(ValidationError::MissingField("end_date")));

        let unknown = RangeQuery::from_pairs(&pairs(&[
            ("start_date", "2024-01-01T00:00:00Z"),
            ("end_date", "2024-01-02T00:00:00Z"),
            ("metrics", "humidity"),
        ]));
        assert!(matches!(unknown, Err(ValidationError::UnknownMetric(_))));
    }

    #[test]
    fn raw_reading_tolerates_unknown_and_null_fields() {
        let json = r#"{"timestamp":"2024-01-01T10:00:00","wind_speed":12.5,"power":null,"id":7,"site":"north"}"#;
        let reading: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert_eq!(reading.value(Metric::WindSpeed), Some(12.5));
        assert_eq!(reading.value(Metric::Power), None);
        assert_eq!(reading.value(Metric::AmbientTemperature), None);
    }

    #[test]
    fn raw_reading_serializes_flat() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let reading = RawReading::new(ts).with(Metric::Power, 100.0).with(Metric::WindSpeed, None);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["power"], 100.0);
        assert!(json["wind_speed"].is_null());
        assert!(json.get("ambient_temperature").is_none());
        assert_eq!(json["timestamp"], "2024-01-01T10:00:00Z");
    }
}
