use crate::db::models::{NewSensorRow, SensorRow};
use crate::schema;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;

/// Readings with `start <= timestamp <= end`, oldest first.
pub fn query_range(conn: &mut PgConnection, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<SensorRow>, String> {
    use schema::source::data::dsl as D;

    D::data
        .filter(D::timestamp.ge(start).and(D::timestamp.le(end)))
        .order((D::timestamp.asc(), D::id.asc()))
        .select(SensorRow::as_select())
        .load(conn)
        .map_err(|e| format!("query sensor rows failed: {}", e))
}

pub fn insert_reading(conn: &mut PgConnection, row: &NewSensorRow) -> Result<SensorRow, String> {
    use schema::source::data::dsl as D;

    diesel::insert_into(D::data)
        .values(row)
        .returning(SensorRow::as_returning())
        .get_result(conn)
        .map_err(|e| format!("insert sensor row failed: {}", e))
}

pub fn insert_sensor_rows(conn: &mut PgConnection, rows: &[NewSensorRow]) -> Result<usize, diesel::result::Error> {
    if rows.is_empty() {
        return Ok(0);
    }

    use schema::source::data::dsl as D;

    diesel::insert_into(D::data).values(rows).execute(conn)
}
