//! The three orchestrator-facing operations.
//!
//! Each operation takes its configuration and the run's staging area,
//! fully succeeds (complete, valid output at the final path) or fully
//! fails (typed error, nothing new at the final path), and is safe to
//! re-invoke: staged outputs are overwritten, never appended. The error's
//! `FailureKind` tells a scheduler whether retrying is worthwhile without
//! it having to inspect any payload.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use foresight_core::merge::{merge_staged, MergeError, MergeSummary};
use foresight_core::sources::fred::{FredClient, FredConfig};
use foresight_core::sources::sec::{EdgarClient, SecConfig};
use foresight_core::sources::SourceError;
use foresight_core::staging::{StagingArea, StagingError};

/// Errors from the task surface.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Manifest(#[from] anyhow::Error),
}

/// Failure classification for scheduler retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream unreachable or rejected the request; retry-worthy.
    Fetch,
    /// Upstream payload does not match the expected schema; retrying
    /// without intervention is futile.
    Parse,
    /// A merge input is absent or empty; the ordering barrier was violated
    /// upstream.
    MissingInput,
    /// Local filesystem or encoding trouble.
    Io,
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Source(SourceError::Fetch { .. }) => FailureKind::Fetch,
            TaskError::Source(SourceError::Parse { .. }) => FailureKind::Parse,
            TaskError::Merge(MergeError::Staging(e)) | TaskError::Staging(e) => staging_kind(e),
            TaskError::Merge(MergeError::Panel(_)) => FailureKind::Io,
            TaskError::Manifest(_) => FailureKind::Io,
        }
    }
}

fn staging_kind(e: &StagingError) -> FailureKind {
    match e {
        StagingError::MissingInput { .. } => FailureKind::MissingInput,
        StagingError::Malformed { .. } => FailureKind::Parse,
        StagingError::Encode { .. } | StagingError::Io { .. } => FailureKind::Io,
    }
}

/// Outcome of a fetch operation.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub source: String,
    pub output_path: PathBuf,
    pub record_count: usize,
}

/// Fetch the latest SEC filings and stage them as `sec_filings.json`.
pub fn fetch_sec(
    config: &SecConfig,
    staging: &StagingArea,
    as_of: NaiveDate,
) -> Result<FetchOutcome, TaskError> {
    let records = EdgarClient::new(config.clone()).fetch_recent(as_of)?;
    let output_path = staging.write_filings(&records)?;
    Ok(FetchOutcome {
        source: "sec".to_string(),
        output_path,
        record_count: records.len(),
    })
}

/// Fetch the configured FRED series over the lookback window and stage them
/// as `fred_indicators.csv`.
pub fn fetch_fred(
    config: &FredConfig,
    staging: &StagingArea,
    as_of: NaiveDate,
) -> Result<FetchOutcome, TaskError> {
    let observations = FredClient::new(config.clone()).fetch_series(as_of)?;
    let output_path = staging.write_indicators(&observations)?;
    Ok(FetchOutcome {
        source: "fred".to_string(),
        output_path,
        record_count: observations.len(),
    })
}

/// Merge the two staged fetch outputs into `merged_data.parquet`.
///
/// Both fetch outputs must already be staged; invoking the merge early is a
/// `FailureKind::MissingInput`, never an implicit empty panel.
pub fn merge(staging: &StagingArea) -> Result<MergeSummary, TaskError> {
    Ok(merge_staged(staging)?)
}
