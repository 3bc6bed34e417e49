//! Run manifest, the durable record of one staged run.
//!
//! Written only after the merge succeeds, so its presence means the staged
//! file set is complete. The publishing step that ships
//! `merged_data.parquet` to durable storage can use the content hashes to
//! verify what it picked up.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use foresight_core::staging::{
    file_hash, StagingArea, FRED_INDICATORS_FILE, MERGED_DATA_FILE, SEC_FILINGS_FILE,
};

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One staged file as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFile {
    pub file_name: String,
    pub record_count: usize,
    /// Blake3 hash of the file bytes, hex encoded.
    pub blake3: String,
}

/// The manifest for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub logical_date: NaiveDate,
    pub filings: StagedFile,
    pub indicators: StagedFile,
    pub merged: StagedFile,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunManifest {
    /// Build a manifest by hashing the three staged files in place.
    pub fn collect(
        staging: &StagingArea,
        logical_date: NaiveDate,
        filing_count: usize,
        observation_count: usize,
        merged_rows: usize,
    ) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            logical_date,
            filings: StagedFile {
                file_name: SEC_FILINGS_FILE.to_string(),
                record_count: filing_count,
                blake3: file_hash(&staging.filings_path())
                    .context("failed to hash staged filings")?,
            },
            indicators: StagedFile {
                file_name: FRED_INDICATORS_FILE.to_string(),
                record_count: observation_count,
                blake3: file_hash(&staging.indicators_path())
                    .context("failed to hash staged indicators")?,
            },
            merged: StagedFile {
                file_name: MERGED_DATA_FILE.to_string(),
                record_count: merged_rows,
                blake3: file_hash(&staging.merged_path())
                    .context("failed to hash merged panel")?,
            },
        })
    }

    /// Write `manifest.json` into the staging directory, atomically.
    pub fn write(&self, staging: &StagingArea) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(self).context("failed to serialize manifest")?;
        staging
            .write_file_atomic(MANIFEST_FILE, &json)
            .context("failed to write manifest")
    }

    /// Load a manifest, rejecting unknown schema versions.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let manifest: RunManifest =
            serde_json::from_str(&content).context("failed to deserialize manifest")?;
        if manifest.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported manifest schema version {} (max supported: {})",
                manifest.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(manifest)
    }
}
