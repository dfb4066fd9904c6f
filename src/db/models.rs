//! Diesel model structs for the raw store and the target store.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::sensor::{Metric, RawReading};
use crate::schema;

// Raw store: data
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::source::data)]
pub struct SensorRow {
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    pub wind_speed: Option<f64>,
    pub power: Option<f64>,
    pub ambient_temperature: Option<f64>,
}

impl SensorRow {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::WindSpeed => self.wind_speed,
            Metric::Power => self.power,
            Metric::AmbientTemperature => self.ambient_temperature,
        }
    }

    /// Project onto the wire shape, keeping only `metrics` (all when `None`).
    pub fn to_reading(&self, metrics: Option<&[Metric]>) -> RawReading {
        let selected = metrics.unwrap_or(&Metric::ALL);
        let mut reading = RawReading::new(self.timestamp);
        for metric in selected {
            reading.set(*metric, self.value(*metric));
        }
        reading
    }
}

#[derive(Debug, Clone, PartialEq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::source::data)]
pub struct NewSensorRow {
    pub timestamp: DateTime<Utc>,
    pub wind_speed: Option<f64>,
    pub power: Option<f64>,
    pub ambient_temperature: Option<f64>,
}

// Target store: signal
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::target::signal)]
pub struct Signal {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::target::signal)]
pub struct NewSignal<'a> {
    pub name: &'a str,
}

// Target store: data (fact table)
#[derive(Debug, Clone, PartialEq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::target::data)]
pub struct NewFact {
    pub timestamp: DateTime<Utc>,
    pub signal_id: i32,
    pub value: Option<f64>,
}
