//! Blocking HTTP client for the source service's sensor API.
//!
//! - Uses `ureq` (no async), one agent per client.
//! - Every response body is read to the end inside the call, so the pooled
//!   connection goes back to the agent whether the call succeeds or fails.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::sensor::{RangeQuery, RawReading};

/// Hard cap on a response body; one day of minute data is well below this.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug)]
pub enum SourceClientError {
    /// Connection, DNS, TLS or timeout failure
    Transport(String),
    Http { status: u16, message: String },
    Json { path: String, message: String },
}

impl core::fmt::Display for SourceClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SourceClientError::Transport(s) => write!(f, "transport error: {}", s),
            SourceClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            SourceClientError::Json { path, message } => write!(f, "json error at {}: {}", path, message),
        }
    }
}

impl std::error::Error for SourceClientError {}

impl From<ureq::Error> for SourceClientError {
    fn from(value: ureq::Error) -> Self {
        SourceClientError::Transport(value.to_string())
    }
}

pub struct SourceClient {
    agent: ureq::Agent,
    base_url: String,
}

impl SourceClient {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api/v1`.
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        SourceClient {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceClientError> {
        let url = self.url(path);
        let mut req = self.agent.get(&url).header("Accept", "application/json");
        for (k, v) in query {
            req = req.query(k, v);
        }

        let mut res = req.call()?;
        let status: http::StatusCode = res.status();
        let body = res.body_mut().with_config().limit(MAX_BODY_BYTES).read_to_string()?;
        if !status.is_success() {
            return Err(SourceClientError::Http {
                status: status.as_u16(),
                message: body,
            });
        }
        decode_json(&body)
    }

    /// `GET /sensors` for an inclusive time window.
    pub fn get_sensor_data(&self, query: &RangeQuery) -> Result<Vec<RawReading>, SourceClientError> {
        self.get_json("/sensors", &sensor_query_params(query))
    }
}

/// Query-string pairs for `GET /sensors`; `metrics` repeats once per metric.
pub fn sensor_query_params(query: &RangeQuery) -> Vec<(&'static str, String)> {
    use chrono::SecondsFormat;

    let mut params = vec![
        ("start_date", query.start().to_rfc3339_opts(SecondsFormat::Secs, true)),
        ("end_date", query.end().to_rfc3339_opts(SecondsFormat::Secs, true)),
    ];
    for metric in query.metrics().unwrap_or_default() {
        params.push(("metrics", metric.as_str().to_string()));
    }
    params
}

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, SourceClientError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| SourceClientError::Json {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}
