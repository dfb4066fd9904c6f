//! Synthetic minute-resolution readings for the raw store.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::db::models::NewSensorRow;
use crate::db::sensors::insert_sensor_rows;
use crate::models::sensor::{ValidationError, MAX_SEED_DAYS};

/// Rows per INSERT; four bind parameters each keeps well under the Postgres limit.
pub const CHUNK_SIZE: usize = 10_000;
const MINUTES_PER_DAY: i64 = 24 * 60;

const WIND_SPEED_RANGE: (f64, f64) = (0.0, 25.0);
const POWER_RANGE: (f64, f64) = (0.0, 5000.0);
const AMBIENT_TEMPERATURE_RANGE: (f64, f64) = (15.0, 35.0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedSummary {
    pub total_records: usize,
    pub start: DateTime<Utc>,
    /// Exclusive: one minute past the last generated reading.
    pub end: DateTime<Utc>,
}

/// A day count within `1..=MAX_SEED_DAYS`; only [`validate_days`] builds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedDays(i64);

impl SeedDays {
    pub fn get(self) -> i64 {
        self.0
    }
}

pub fn validate_days(days: i64) -> Result<SeedDays, ValidationError> {
    if (1..=MAX_SEED_DAYS).contains(&days) {
        Ok(SeedDays(days))
    } else {
        Err(ValidationError::InvalidDays(days))
    }
}

/// Seed `days` of readings from `start` inside one transaction.
pub fn run(conn: &mut PgConnection, start: DateTime<Utc>, days: SeedDays) -> Result<SeedSummary, String> {
    let mut rng = SmallRng::from_rng(&mut rand::rng());

    info!("Seed: generating {} day(s) of readings from {}", days.get(), start);
    let summary = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            generate(start, days, &mut rng, |chunk| insert_sensor_rows(conn, chunk))
        })
        .map_err(|e| format!("seeding failed: {}", e))?;
    info!(
        "Seed: complete (records={}, start={}, end={})",
        summary.total_records, summary.start, summary.end
    );
    Ok(summary)
}

/// Generate one reading per minute and hand them to `flush` in chunks of
/// `CHUNK_SIZE`. Stops at the first flush error.
pub fn generate<E, F>(start: DateTime<Utc>, days: SeedDays, rng: &mut SmallRng, mut flush: F) -> Result<SeedSummary, E>
where
    F: FnMut(&[NewSensorRow]) -> Result<usize, E>,
{
    let total_minutes = days.get() * MINUTES_PER_DAY;
    let mut batch = Vec::with_capacity(CHUNK_SIZE.min(total_minutes as usize));
    let mut ts = start;

    for _ in 0..total_minutes {
        batch.push(random_row(ts, rng));
        ts += Duration::minutes(1);
        if batch.len() == CHUNK_SIZE {
            let inserted = flush(&batch)?;
            debug!("Seed: flushed {} row(s) up to {}", inserted, ts);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        flush(&batch)?;
    }

    Ok(SeedSummary {
        total_records: total_minutes as usize,
        start,
        end: ts,
    })
}

fn random_row(timestamp: DateTime<Utc>, rng: &mut SmallRng) -> NewSensorRow {
    NewSensorRow {
        timestamp,
        wind_speed: Some(sample(rng, WIND_SPEED_RANGE)),
        power: Some(sample(rng, POWER_RANGE)),
        ambient_temperature: Some(sample(rng, AMBIENT_TEMPERATURE_RANGE)),
    }
}

fn sample(rng: &mut SmallRng, (lo, hi): (f64, f64)) -> f64 {
    round2(rng.random_range(lo..=hi))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
