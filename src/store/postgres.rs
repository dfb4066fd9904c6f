use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel::PgConnection;
use log::debug;
use std::time::Duration;

use crate::db::migrate::{apply_database_migrations, TARGET_MIGRATIONS};
use crate::db::models::{NewFact, NewSignal, Signal};
use crate::schema;
use crate::store::{StoreError, TargetStore};

/// Postgres binds at most 65535 parameters per statement; a fact uses three.
const UPSERT_CHUNK_ROWS: usize = 10_000;

pub struct PgTargetStore {
    conn: PgConnection,
}

impl PgTargetStore {
    /// Connect and cap every statement of this session at `statement_timeout`.
    ///
    /// The same bound applies to establishing the connection unless
    /// `database_url` already sets `connect_timeout`.
    pub fn connect(database_url: &str, statement_timeout: Duration) -> Result<Self, StoreError> {
        let url = with_connect_timeout(database_url, statement_timeout);
        let mut conn = PgConnection::establish(&url).map_err(|e| StoreError::Connection(e.to_string()))?;
        diesel::sql_query(format!("SET statement_timeout = {}", statement_timeout.as_millis()))
            .execute(&mut conn)?;
        Ok(PgTargetStore { conn })
    }

    pub fn migrate(&mut self) -> Result<(), String> {
        apply_database_migrations(&mut self.conn, TARGET_MIGRATIONS, "Target")
    }
}

/// Add libpq's `connect_timeout` (whole seconds, at least 1) to a URL or a
/// key/value connection string that does not set one.
fn with_connect_timeout(database_url: &str, timeout: Duration) -> String {
    if database_url.contains("connect_timeout=") {
        return database_url.to_string();
    }
    let secs = timeout.as_secs().max(1);
    if !(database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")) {
        return format!("{} connect_timeout={}", database_url.trim_end(), secs);
    }
    let sep = match database_url.find('?') {
        None => "?",
        Some(i) if i + 1 == database_url.len() || database_url.ends_with('&') => "",
        Some(_) => "&",
    };
    format!("{}{}connect_timeout={}", database_url, sep, secs)
}

impl TargetStore for PgTargetStore {
    fn load_signals(&mut self) -> Result<Vec<Signal>, StoreError> {
        use schema::target::signal::dsl as S;

        Ok(S::signal
            .select(Signal::as_select())
            .order(S::id.asc())
            .load(&mut self.conn)?)
    }

    fn insert_signals(&mut self, names: &[String]) -> Result<Vec<Signal>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        use schema::target::signal::dsl as S;

        let rows = names.iter().map(|name| NewSignal { name }).collect::<Vec<_>>();
        // Rows another writer created first are skipped and missing from RETURNING.
        let created = diesel::insert_into(S::signal)
            .values(&rows)
            .on_conflict(S::name)
            .do_nothing()
            .returning(Signal::as_returning())
            .get_results(&mut self.conn)?;
        debug!("Store: inserted {}/{} signal(s)", created.len(), names.len());
        Ok(created)
    }

    fn upsert_facts(&mut self, facts: &[NewFact]) -> Result<usize, StoreError> {
        if facts.is_empty() {
            return Ok(0);
        }

        use schema::target::data::dsl as D;

        let affected = self.conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let mut total = 0;
            for chunk in facts.chunks(UPSERT_CHUNK_ROWS) {
                total += diesel::insert_into(D::data)
                    .values(chunk)
                    .on_conflict((D::timestamp, D::signal_id))
                    .do_update()
                    .set(D::value.eq(excluded(D::value)))
                    .execute(conn)?;
            }
            Ok(total)
        })?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn connect_timeout_is_added_to_urls() {
        assert_eq!(
            with_connect_timeout("postgres://etl@localhost/warehouse", TIMEOUT),
            "postgres://etl@localhost/warehouse?connect_timeout=30"
        );
        assert_eq!(
            with_connect_timeout("postgresql://etl@localhost/warehouse?sslmode=disable", TIMEOUT),
            "postgresql://etl@localhost/warehouse?sslmode=disable&connect_timeout=30"
        );
        assert_eq!(
            with_connect_timeout("postgres://etl@localhost/warehouse?", TIMEOUT),
            "postgres://etl@localhost/warehouse?connect_timeout=30"
        );
    }

    #[test]
    fn connect_timeout_is_added_to_key_value_strings() {
        assert_eq!(
            with_connect_timeout("host=localhost dbname=warehouse", TIMEOUT),
            "host=localhost dbname=warehouse connect_timeout=30"
        );
    }

    #[test]
    fn explicit_connect_timeout_is_kept() {
        let url = "postgres://etl@localhost/warehouse?connect_timeout=3";
        assert_eq!(with_connect_timeout(url, TIMEOUT), url);
    }

    #[test]
    fn sub_second_timeouts_round_up() {
        assert_eq!(
            with_connect_timeout("postgres://localhost/w", Duration::from_millis(200)),
            "postgres://localhost/w?connect_timeout=1"
        );
    }
}
