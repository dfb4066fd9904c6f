//! Ten-minute resampling of raw readings into long-format signal rows.
//!
//! Pure and synchronous: readings are grouped by epoch-aligned bucket, then
//! mean/min/max/std are computed per tracked metric straight from each
//! bucket's value list. Values are sorted before summation so the output does
//! not depend on the order readings arrived in.

use chrono::{DateTime, Utc};
use log::warn;
use std::collections::BTreeMap;

use crate::models::sensor::{signal_name, Metric, RawReading, Statistic};

pub const BUCKET_SECONDS: i64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub bucket_start: DateTime<Utc>,
    pub metric: Metric,
    pub statistic: Statistic,
    pub value: f64,
}

impl AggregatedRow {
    pub fn signal_name(&self) -> String {
        signal_name(self.metric, self.statistic)
    }
}

/// Statistics of one metric within one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `None` with fewer than two samples.
    pub std: Option<f64>,
}

impl Summary {
    pub fn get(&self, statistic: Statistic) -> Option<f64> {
        match statistic {
            Statistic::Mean => Some(self.mean),
            Statistic::Min => Some(self.min),
            Statistic::Max => Some(self.max),
            Statistic::Std => self.std,
        }
    }
}

/// Start of the right-open 10-minute bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = ts.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(BUCKET_SECONDS), 0)
}

/// Summarise `values`, which must already be sorted ascending.
///
/// Large values are divided by a power of two before summing. That is exact,
/// so ordinary inputs give the same result as an unscaled pass while inputs
/// near `f64::MAX` no longer overflow to infinity.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let (&min, &max) = (values.first()?, values.last()?);
    let scale = magnitude_scale(min.abs().max(max.abs()));
    let n = values.len() as f64;

    let mean = (values.iter().map(|v| v / scale).sum::<f64>() / n).clamp(min / scale, max / scale);
    let std = (values.len() > 1).then(|| {
        let squares: f64 = values.iter().map(|v| v / scale - mean).map(|d| d * d).sum();
        (squares / (n - 1.0)).sqrt() * scale
    });
    let mean = mean * scale;
    Some(Summary {
        count: values.len(),
        mean,
        min,
        max,
        std,
    })
}

/// Largest power of two not above `magnitude`, or 1 for magnitudes below 1.
fn magnitude_scale(magnitude: f64) -> f64 {
    if magnitude > 1.0 {
        // log2 rounds to 1024 near f64::MAX; 2^1024 would overflow.
        2f64.powi(magnitude.log2().floor().min(f64::MAX_EXP as f64 - 1.0) as i32)
    } else {
        1.0
    }
}

/// Aggregate `readings` into rows ordered by bucket, metric, then statistic.
///
/// Null, missing and non-finite values are skipped; a metric with no samples
/// in a bucket produces no rows, and `std` is omitted for single samples.
pub fn aggregate(readings: &[RawReading]) -> Vec<AggregatedRow> {
    let mut buckets: BTreeMap<DateTime<Utc>, [Vec<f64>; Metric::ALL.len()]> = BTreeMap::new();

    for reading in readings {
        let Some(start) = bucket_start(reading.timestamp) else {
            warn!("Aggregate: skipping reading at {} (bucket out of range)", reading.timestamp);
            continue;
        };
        let series = buckets.entry(start).or_default();
        for (metric, values) in Metric::ALL.iter().zip(series.iter_mut()) {
            if let Some(v) = reading.value(*metric).filter(|v| v.is_finite()) {
                values.push(v);
            }
        }
    }

    let mut rows = Vec::with_capacity(buckets.len() * Metric::ALL.len() * Statistic::ALL.len());
    for (bucket_start, mut series) in buckets {
        for (metric, values) in Metric::ALL.iter().zip(series.iter_mut()) {
            values.sort_unstable_by(f64::total_cmp);
            let Some(summary) = summarize(values) else {
                continue;
            };
            for statistic in Statistic::ALL {
                if let Some(value) = summary.get(statistic) {
                    rows.push(AggregatedRow {
                        bucket_start,
                        metric: *metric,
                        statistic,
                        value,
                    });
                }
            }
        }
    }
    rows
}
