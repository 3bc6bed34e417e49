//! Local whole-pipeline execution.
//!
//! Walks the standard task graph in-process: the two fetches in parallel,
//! a hard barrier, then the merge and the manifest. This is the same
//! ordering an external scheduler applies across processes; running it
//! locally is useful for development and for exercising the wiring.
//! Scheduling policy (retries on transient fetch failures, timeouts,
//! calendar triggers) stays outside.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use foresight_core::merge::MergeSummary;
use foresight_core::staging::StagingArea;

use crate::config::PipelineConfig;
use crate::manifest::RunManifest;
use crate::tasks::{self, FetchOutcome, TaskError};

/// Report of one completed local run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub logical_date: NaiveDate,
    pub sec: FetchOutcome,
    pub fred: FetchOutcome,
    pub merged: MergeSummary,
    pub manifest_path: PathBuf,
}

/// Execute the full pipeline for one logical date into `staging`.
///
/// The fetches run in parallel; the merge does not start unless both have
/// fully succeeded. A failed run propagates the first error and leaves no
/// merged artifact or manifest behind.
pub fn run_pipeline(
    config: &PipelineConfig,
    staging: &StagingArea,
    logical_date: NaiveDate,
) -> Result<RunReport, TaskError> {
    info!(%logical_date, dir = %staging.dir().display(), "pipeline run starting");

    let (sec, fred) = rayon::join(
        || tasks::fetch_sec(&config.sec, staging, logical_date),
        || tasks::fetch_fred(&config.fred, staging, logical_date),
    );
    let sec = sec?;
    let fred = fred?;

    // Hard barrier: both fetch outputs are staged before the merge reads.
    let merged = tasks::merge(staging)?;

    let manifest = RunManifest::collect(
        staging,
        logical_date,
        sec.record_count,
        fred.record_count,
        merged.rows,
    )?;
    let manifest_path = manifest.write(staging)?;

    info!(
        filings = sec.record_count,
        observations = fred.record_count,
        rows = merged.rows,
        "pipeline run complete"
    );

    Ok(RunReport {
        logical_date,
        sec,
        fred,
        merged,
        manifest_path,
    })
}
