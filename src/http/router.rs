use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api_v1 = Router::new()
        .route("/sensors", get(handlers::get_sensor_data).post(handlers::create_sensor_data))
        .route("/sensors/populate_database", post(handlers::populate_database))
        .route("/seed", post(handlers::populate_database));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_v1)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::{header, Request, StatusCode};
    use diesel::r2d2::{ConnectionManager, Pool};
    use serde_json::Value;
    use tower::ServiceExt;

    // Validation runs before any connection is taken, so an unreachable
    // database is never contacted by these requests.
    fn router() -> Router {
        let manager = ConnectionManager::new("postgres://nobody@127.0.0.1:1/none");
        let pool = Pool::builder().min_idle(Some(0)).build_unchecked(manager);
        create_router(AppState::new(pool))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn rejects_malformed_start_date() {
        let (status, body) = send(get("/api/v1/sensors?start_date=yesterday&end_date=2024-01-01T00:00:00Z")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("start_date"));
    }

    #[tokio::test]
    async fn rejects_inverted_range() {
        let (status, body) =
            send(get("/api/v1/sensors?start_date=2024-01-02T00:00:00Z&end_date=2024-01-01T00:00:00Z")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("must not be after"));
    }

    #[tokio::test]
    async fn rejects_unknown_metric() {
        let (status, body) = send(get(
            "/api/v1/sensors?start_date=2024-01-01T00:00:00Z&end_date=2024-01-01T23:59:59Z&metrics=id",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("unknown metric"));
    }

    #[tokio::test]
    async fn rejects_missing_bounds() {
        let (status, _) = send(get("/api/v1/sensors?start_date=2024-01-01T00:00:00Z")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn seed_rejects_non_positive_days() {
        for uri in ["/api/v1/sensors/populate_database", "/api/v1/seed"] {
            let (status, body) = send(post_json(uri, r#"{"start_date":"2024-01-01T00:00:00","days":0}"#)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["message"].as_str().unwrap().contains("days"));
        }
    }

    #[tokio::test]
    async fn seed_rejects_bad_payload() {
        let (status, body) = send(post_json("/api/v1/seed", r#"{"start_date":"not a date"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}
