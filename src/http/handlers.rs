//! HTTP handlers for the source API.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use http::StatusCode;
use log::info;

use super::dto::{HealthResponse, NewReadingRequest, SeedRequest, SeedResponse};
use super::error::AppError;
use super::state::AppState;
use crate::db::models::NewSensorRow;
use crate::db::sensors;
use crate::models::sensor::{RangeQuery, RawReading};
use crate::services::seed;

pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/v1/sensors?start_date=…&end_date=…[&metrics=…]
///
/// Readings in the inclusive window, oldest first, projected onto the
/// requested metrics (all when none are given).
pub async fn get_sensor_data(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> HandlerResult<Vec<RawReading>> {
    let Query(pairs) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let range = RangeQuery::from_pairs(&pairs)?;

    let (start, end) = (range.start(), range.end());
    let rows = state.with_conn(move |conn| sensors::query_range(conn, start, end)).await?;
    let metrics = range.metrics();
    Ok(Json(rows.iter().map(|row| row.to_reading(metrics)).collect()))
}

/// POST /api/v1/sensors
pub async fn create_sensor_data(
    State(state): State<AppState>,
    payload: Result<Json<NewReadingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RawReading>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let row = NewSensorRow::from(request);
    let stored = state.with_conn(move |conn| sensors::insert_reading(conn, &row)).await?;
    Ok((StatusCode::CREATED, Json(stored.to_reading(None))))
}

/// POST /api/v1/sensors/populate_database (also /api/v1/seed)
pub async fn populate_database(
    State(state): State<AppState>,
    payload: Result<Json<SeedRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SeedResponse>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let days = seed::validate_days(request.days)?;
    let start = request.start_date;

    let summary = state.with_conn(move |conn| seed::run(conn, start, days)).await?;
    info!("Source API: seeded {} reading(s)", summary.total_records);
    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            message: "Data inserted successfully".to_string(),
            details: summary,
        }),
    ))
}
