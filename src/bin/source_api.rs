//! Source service: stores raw readings and serves them over HTTP.

use clap::Parser;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use log::{error, info};
use std::path::PathBuf;

use windfarm_etl::config::SourceConfig;
use windfarm_etl::db::migrate::{apply_database_migrations, SOURCE_MIGRATIONS};
use windfarm_etl::env_file;
use windfarm_etl::http::{create_router, AppState};

/// Serve raw wind-farm readings.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

async fn run() -> Result<(), String> {
    let cfg = SourceConfig::from_env()?;
    info!("Config loaded (bind={}, pool_max={})", cfg.bind_addr(), cfg.pool_max);

    let manager = ConnectionManager::<PgConnection>::new(&cfg.database_url);
    let pool = Pool::builder()
        .max_size(cfg.pool_max)
        .build(manager)
        .map_err(|e| format!("DB pool setup failed: {}", e))?;
    info!("Connected to source database");

    let migration_pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = migration_pool
            .get()
            .map_err(|e| format!("DB connection failed: {}", e))?;
        apply_database_migrations(&mut conn, SOURCE_MIGRATIONS, "Source")
    })
    .await
    .map_err(|e| format!("migration task failed: {}", e))??;

    let app = create_router(AppState::new(pool));
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr())
        .await
        .map_err(|e| format!("bind {} failed: {}", cfg.bind_addr(), e))?;
    info!("Listening on http://{}", cfg.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded_env = match env_file::load(cli.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "source-api {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run().await {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
