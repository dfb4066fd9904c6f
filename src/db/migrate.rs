use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

pub const SOURCE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/source");
pub const TARGET_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/target");

pub fn apply_database_migrations(
    conn: &mut PgConnection,
    migrations: EmbeddedMigrations,
    store: &str,
) -> Result<(), String> {
    match conn.run_pending_migrations(migrations) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("{} schema is up to date; no migrations were applied", store);
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} {} migration(s): {}", applied.len(), store, names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying {} migrations failed: {}", store, e)),
    }
}
