use chrono::{NaiveDate, Utc};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use windfarm_etl::client::SourceClient;
use windfarm_etl::config::EtlConfig;
use windfarm_etl::env_file;
use windfarm_etl::models::sensor::parse_day;
use windfarm_etl::services::pipeline::{run_day, PipelineOutcome};
use windfarm_etl::store::postgres::PgTargetStore;

/// Aggregate one day of raw wind-farm readings into 10-minute signals.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Day to process (YYYY-MM-DD, UTC); defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_day(raw).map_err(|e| e.to_string())
}

pub fn run(day: NaiveDate) -> Result<(), String> {
    // 1) Load config
    let cfg = EtlConfig::from_env()?;
    info!(
        "Config loaded (source_api_url={}, timeout={}s, metrics={})",
        cfg.source_api_url,
        cfg.timeout.as_secs(),
        cfg.metrics
            .as_ref()
            .map(|m| m.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(","))
            .unwrap_or_else(|| "all".to_string())
    );

    // 2) Connect target store and apply pending migrations
    let mut store =
        PgTargetStore::connect(&cfg.database_url, cfg.timeout).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to target database");
    store.migrate()?;

    // 3) Run the pipeline for the requested day
    let client = SourceClient::new(cfg.source_api_url.clone(), cfg.timeout);
    match run_day(&client, &mut store, day, cfg.metrics.as_deref()).map_err(|e| e.to_string())? {
        PipelineOutcome::Loaded(summary) => info!(
            "ETL for {} complete (rows_affected={}, signals_created={})",
            day, summary.rows_affected, summary.signals_created
        ),
        PipelineOutcome::EmptyAfterTransform { raw_records } => {
            info!("ETL for {} complete: nothing to load (raw_records={})", day, raw_records)
        }
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let loaded_env = match env_file::load(cli.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "windfarm-etl {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    let day = cli.date.unwrap_or_else(|| Utc::now().date_naive());
    if let Err(e) = run(day) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
