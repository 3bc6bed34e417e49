//! Staging area for one pipeline run.
//!
//! The three staged file names are contract constants: the merge locates its
//! inputs by name, and the orchestrator hands `merged_data.parquet` to
//! durable storage. All writes go to a temp file first and are renamed into
//! place, so a cancelled or failed operation never leaves a partial file at
//! a final path, and a re-run overwrites rather than appends.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::filings::FilingRecord;
use crate::indicators::IndicatorObservation;

/// Staged SEC fetch output.
pub const SEC_FILINGS_FILE: &str = "sec_filings.json";
/// Staged FRED fetch output.
pub const FRED_INDICATORS_FILE: &str = "fred_indicators.csv";
/// Merged panel output.
pub const MERGED_DATA_FILE: &str = "merged_data.parquet";

/// Which merge input a staging error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSide {
    Filings,
    Indicators,
}

impl InputSide {
    pub fn file_name(&self) -> &'static str {
        match self {
            InputSide::Filings => SEC_FILINGS_FILE,
            InputSide::Indicators => FRED_INDICATORS_FILE,
        }
    }
}

impl std::fmt::Display for InputSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSide::Filings => f.write_str("sec filings"),
            InputSide::Indicators => f.write_str("fred indicators"),
        }
    }
}

/// Errors from the staging layer.
#[derive(Debug, Error)]
pub enum StagingError {
    /// A merge input is absent, or present but holds zero records. Either
    /// way the merge must not run; this usually means the orchestrator
    /// invoked the merge before both fetches completed.
    #[error("missing merge input: {side} at {path}")]
    MissingInput { side: InputSide, path: PathBuf },

    /// A staged file exists but does not decode.
    #[error("staged {side} file is malformed: {reason}")]
    Malformed { side: InputSide, reason: String },

    /// Records could not be encoded for staging.
    #[error("failed to encode {side} records: {reason}")]
    Encode { side: InputSide, reason: String },

    #[error("staging I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The staging directory for one run.
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Staging directory keyed by a logical run date: `<root>/<YYYY-MM-DD>/`.
    ///
    /// Distinct dates never share a directory, so runs for different dates
    /// cannot collide. Keeping two runs for the *same* date from executing
    /// concurrently is the orchestrator's responsibility.
    pub fn keyed(root: impl AsRef<Path>, logical_date: NaiveDate) -> Self {
        Self {
            dir: root.as_ref().join(logical_date.to_string()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filings_path(&self) -> PathBuf {
        self.dir.join(SEC_FILINGS_FILE)
    }

    pub fn indicators_path(&self) -> PathBuf {
        self.dir.join(FRED_INDICATORS_FILE)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.dir.join(MERGED_DATA_FILE)
    }

    /// Write `sec_filings.json`, overwriting any previous run's file.
    pub fn write_filings(&self, records: &[FilingRecord]) -> Result<PathBuf, StagingError> {
        let json = serde_json::to_vec_pretty(records).map_err(|e| StagingError::Encode {
            side: InputSide::Filings,
            reason: e.to_string(),
        })?;
        let path = self.write_file_atomic(SEC_FILINGS_FILE, &json)?;
        info!(count = records.len(), path = %path.display(), "staged SEC filings");
        Ok(path)
    }

    /// Write `fred_indicators.csv` in long form, overwriting.
    pub fn write_indicators(
        &self,
        observations: &[IndicatorObservation],
    ) -> Result<PathBuf, StagingError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for obs in observations {
            writer.serialize(obs).map_err(|e| StagingError::Encode {
                side: InputSide::Indicators,
                reason: e.to_string(),
            })?;
        }
        let bytes = writer.into_inner().map_err(|e| StagingError::Encode {
            side: InputSide::Indicators,
            reason: e.to_string(),
        })?;

        let path = self.write_file_atomic(FRED_INDICATORS_FILE, &bytes)?;
        info!(count = observations.len(), path = %path.display(), "staged FRED indicators");
        Ok(path)
    }

    /// Load staged filings, enforcing the merge-input contract: an absent or
    /// empty file is a missing input, a present-but-undecodable file is
    /// malformed.
    pub fn load_filings(&self) -> Result<Vec<FilingRecord>, StagingError> {
        let path = self.filings_path();
        let bytes = self.read_input(InputSide::Filings, &path)?;

        let records: Vec<FilingRecord> =
            serde_json::from_slice(&bytes).map_err(|e| StagingError::Malformed {
                side: InputSide::Filings,
                reason: e.to_string(),
            })?;

        if records.is_empty() {
            return Err(StagingError::MissingInput {
                side: InputSide::Filings,
                path,
            });
        }
        Ok(records)
    }

    /// Load staged indicator observations under the same contract.
    pub fn load_indicators(&self) -> Result<Vec<IndicatorObservation>, StagingError> {
        let path = self.indicators_path();
        let bytes = self.read_input(InputSide::Indicators, &path)?;

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let mut observations = Vec::new();
        for row in reader.deserialize() {
            let obs: IndicatorObservation = row.map_err(|e| StagingError::Malformed {
                side: InputSide::Indicators,
                reason: e.to_string(),
            })?;
            observations.push(obs);
        }

        if observations.is_empty() {
            return Err(StagingError::MissingInput {
                side: InputSide::Indicators,
                path,
            });
        }
        Ok(observations)
    }

    /// Atomically write a file into the staging directory: write to a `.tmp`
    /// sibling, then rename into place.
    pub fn write_file_atomic(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StagingError> {
        fs::create_dir_all(&self.dir).map_err(|e| StagingError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.dir.join(file_name);
        let tmp_path = self.dir.join(format!("{file_name}.tmp"));

        fs::write(&tmp_path, bytes).map_err(|e| StagingError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StagingError::Io {
                path: path.clone(),
                source: e,
            }
        })?;

        Ok(path)
    }

    fn read_input(&self, side: InputSide, path: &Path) -> Result<Vec<u8>, StagingError> {
        if !path.exists() {
            return Err(StagingError::MissingInput {
                side,
                path: path.to_path_buf(),
            });
        }
        fs::read(path).map_err(|e| StagingError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Blake3 hash of a staged file's bytes, hex encoded.
pub fn file_hash(path: &Path) -> Result<String, StagingError> {
    let bytes = fs::read(path).map_err(|e| StagingError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
