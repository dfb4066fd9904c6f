//! One-day ETL run: extract → aggregate → load.
//!
//! Nothing is written to the target store unless extraction succeeded, and a
//! day whose aggregation is empty skips the load entirely.

use chrono::NaiveDate;
use core::fmt;
use log::{info, warn};

use crate::models::sensor::Metric;
use crate::services::aggregate::aggregate;
use crate::services::extract::{extract_day, ExtractError, RawSource};
use crate::services::load::{LoadError, LoadOutcome, LoadSummary, Loader};
use crate::services::registry::SignalRegistry;
use crate::store::TargetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Transforming,
    Loading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extracting => "EXTRACTING",
            Stage::Transforming => "TRANSFORMING",
            Stage::Loading => "LOADING",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Loaded(LoadSummary),
    /// Raw data existed (possibly zero rows) but produced no aggregates.
    EmptyAfterTransform { raw_records: usize },
}

#[derive(Debug)]
pub enum PipelineError {
    Extract(ExtractError),
    Load(LoadError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Extract(_) => Stage::Extracting,
            PipelineError::Load(_) => Stage::Loading,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Extract(e) => write!(f, "{} failed: {}", self.stage(), e),
            PipelineError::Load(e) => write!(f, "{} failed: {}", self.stage(), e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Extract(e) => Some(e),
            PipelineError::Load(e) => Some(e),
        }
    }
}

impl From<ExtractError> for PipelineError {
    fn from(value: ExtractError) -> Self {
        PipelineError::Extract(value)
    }
}

impl From<LoadError> for PipelineError {
    fn from(value: LoadError) -> Self {
        PipelineError::Load(value)
    }
}

pub fn run_day<R, S>(
    source: &R,
    store: &mut S,
    day: NaiveDate,
    metrics: Option<&[Metric]>,
) -> Result<PipelineOutcome, PipelineError>
where
    R: RawSource + ?Sized,
    S: TargetStore + ?Sized,
{
    info!("Pipeline: {} {}", Stage::Extracting, day);
    let readings = extract_day(source, day, metrics)?;

    info!("Pipeline: {} {} reading(s)", Stage::Transforming, readings.len());
    let rows = aggregate(&readings);
    if rows.is_empty() {
        warn!("Pipeline: no aggregates for {}; skipping load", day);
        return Ok(PipelineOutcome::EmptyAfterTransform {
            raw_records: readings.len(),
        });
    }

    info!("Pipeline: {} {} aggregate row(s)", Stage::Loading, rows.len());
    match Loader::new(SignalRegistry::new()).load(store, &rows)? {
        LoadOutcome::Upserted(summary) => Ok(PipelineOutcome::Loaded(summary)),
        LoadOutcome::Empty => Ok(PipelineOutcome::EmptyAfterTransform {
            raw_records: readings.len(),
        }),
    }
}
