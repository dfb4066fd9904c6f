use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use tokio::task;

use super::error::AppError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, String> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| AppError::Internal(format!("database unavailable: {}", e)))?;
            f(&mut conn).map_err(AppError::Internal)
        })
        .await
        .map_err(|e| AppError::Internal(format!("task join error: {}", e)))?
    }
}
