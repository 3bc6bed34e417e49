//! Point-in-time merge of staged filings and indicator series.
//!
//! Each filing row is joined with the latest observation of every indicator
//! series at or before the filing date (`value_as_of`). Filing rows are
//! preserved exactly, in their staged input order; the merge never
//! fabricates or drops rows. The panel is written as parquet through the
//! staging area's atomic write, so a failed merge leaves nothing at the
//! final path.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::filings::FilingRecord;
use crate::indicators::{group_by_series, value_as_of};
use crate::staging::{StagingArea, StagingError, MERGED_DATA_FILE};

/// Errors from the merge.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("panel assembly failed: {0}")]
    Panel(String),
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub output_path: PathBuf,
    /// Rows in the panel; always equals the staged filing count.
    pub rows: usize,
    /// Indicator series joined on, in panel column order.
    pub series: Vec<String>,
}

/// Merge the staged fetch outputs under `staging` into `merged_data.parquet`.
///
/// Inputs are located by their contract file names. An absent or empty input
/// fails with `StagingError::MissingInput` naming the side; the merge never
/// falls back to an implicit empty dataset. Identical staged inputs always
/// produce identical output: row order is the filing input order and column
/// order is fixed (filing columns, then series names ascending).
pub fn merge_staged(staging: &StagingArea) -> Result<MergeSummary, MergeError> {
    let filings = staging.load_filings()?;
    let observations = staging.load_indicators()?;
    let series = group_by_series(&observations);

    info!(
        filings = filings.len(),
        series = series.len(),
        "merging staged inputs"
    );

    let df = build_panel(&filings, &series)?;
    let bytes = panel_to_parquet_bytes(df)?;
    let output_path = staging.write_file_atomic(MERGED_DATA_FILE, &bytes)?;

    info!(rows = filings.len(), path = %output_path.display(), "merged panel written");

    Ok(MergeSummary {
        output_path,
        rows: filings.len(),
        series: series.keys().cloned().collect(),
    })
}

/// Assemble the merged panel: one row per filing, one nullable column per
/// indicator series.
fn build_panel(
    filings: &[FilingRecord],
    series: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
) -> Result<DataFrame, MergeError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

    let ciks: Vec<String> = filings.iter().map(|f| f.cik.clone()).collect();
    let companies: Vec<String> = filings.iter().map(|f| f.company.clone()).collect();
    let form_types: Vec<String> = filings.iter().map(|f| f.form_type.clone()).collect();
    let accessions: Vec<String> = filings.iter().map(|f| f.accession.clone()).collect();
    let filed_days: Vec<i32> = filings
        .iter()
        .map(|f| (f.filed - epoch).num_days() as i32)
        .collect();
    let period_days: Vec<Option<i32>> = filings
        .iter()
        .map(|f| {
            f.period_of_report
                .map(|d| (d - epoch).num_days() as i32)
        })
        .collect();

    let mut columns = vec![
        Column::new("cik".into(), ciks),
        Column::new("company".into(), companies),
        Column::new("form_type".into(), form_types),
        Column::new("filed".into(), filed_days)
            .cast(&DataType::Date)
            .map_err(|e| MergeError::Panel(format!("filed cast: {e}")))?,
        Column::new("accession".into(), accessions),
        Column::new("period_of_report".into(), period_days)
            .cast(&DataType::Date)
            .map_err(|e| MergeError::Panel(format!("period cast: {e}")))?,
    ];

    // One column per series: latest observation at or before the filing
    // date, null where no observation qualifies.
    for (series_id, points) in series {
        let values: Vec<Option<f64>> = filings
            .iter()
            .map(|f| value_as_of(points, f.filed))
            .collect();
        columns.push(Column::new(series_id.as_str().into(), values));
    }

    DataFrame::new(columns).map_err(|e| MergeError::Panel(format!("dataframe creation: {e}")))
}

/// Serialize the panel to parquet in memory, so the only filesystem write is
/// the staging area's atomic one.
fn panel_to_parquet_bytes(mut df: DataFrame) -> Result<Vec<u8>, MergeError> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| MergeError::Panel(format!("write parquet: {e}")))?;
    Ok(buf)
}

/// Load a merged panel back from disk.
pub fn read_merged(path: &Path) -> Result<DataFrame, MergeError> {
    let file = fs::File::open(path).map_err(|e| {
        MergeError::Staging(StagingError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| MergeError::Panel(format!("read parquet: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorObservation;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_staging() -> StagingArea {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("foresight_merge_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        StagingArea::new(dir)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn filing(cik: &str, filed: &str) -> FilingRecord {
        FilingRecord {
            cik: cik.into(),
            company: format!("Company {cik}"),
            form_type: "10-Q".into(),
            filed: d(filed),
            accession: format!("{cik}-24-000001"),
            period_of_report: None,
        }
    }

    fn obs(series: &str, date: &str, value: f64) -> IndicatorObservation {
        IndicatorObservation {
            series_id: series.into(),
            date: d(date),
            value,
        }
    }

    fn stage(
        staging: &StagingArea,
        filings: &[FilingRecord],
        observations: &[IndicatorObservation],
    ) {
        staging.write_filings(filings).unwrap();
        staging.write_indicators(observations).unwrap();
    }

    #[test]
    fn join_is_point_in_time() {
        let staging = temp_staging();
        stage(
            &staging,
            &[filing("0000000001", "2024-03-15")],
            &[
                obs("FEDFUNDS", "2024-02-01", 3.1),
                obs("FEDFUNDS", "2024-04-01", 3.3),
            ],
        );

        merge_staged(&staging).unwrap();
        let df = read_merged(&staging.merged_path()).unwrap();

        // The 2024-04-01 observation is in the future of the filing and must
        // never be chosen.
        let values = df.column("FEDFUNDS").unwrap().f64().unwrap();
        assert_eq!(values.get(0), Some(3.1));

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn filing_before_all_history_gets_null() {
        let staging = temp_staging();
        stage(
            &staging,
            &[filing("0000000001", "2024-01-15")],
            &[obs("FEDFUNDS", "2024-02-01", 3.1)],
        );

        merge_staged(&staging).unwrap();
        let df = read_merged(&staging.merged_path()).unwrap();

        let values = df.column("FEDFUNDS").unwrap().f64().unwrap();
        assert_eq!(values.get(0), None);

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn every_filing_row_survives_in_input_order() {
        let staging = temp_staging();
        stage(
            &staging,
            &[
                filing("0000000003", "2024-03-01"),
                filing("0000000001", "2024-01-01"),
                filing("0000000002", "2024-02-01"),
            ],
            &[obs("UNRATE", "2024-01-15", 3.7)],
        );

        let summary = merge_staged(&staging).unwrap();
        assert_eq!(summary.rows, 3);

        let df = read_merged(&staging.merged_path()).unwrap();
        assert_eq!(df.height(), 3);

        // Row order is the staged filing order, not a re-sort.
        let ciks = df.column("cik").unwrap().str().unwrap();
        assert_eq!(ciks.get(0), Some("0000000003"));
        assert_eq!(ciks.get(1), Some("0000000001"));
        assert_eq!(ciks.get(2), Some("0000000002"));

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn series_columns_are_sorted_for_determinism() {
        let staging = temp_staging();
        stage(
            &staging,
            &[filing("0000000001", "2024-03-15")],
            &[
                obs("UNRATE", "2024-03-01", 3.9),
                obs("DGS10", "2024-03-01", 4.2),
                obs("FEDFUNDS", "2024-03-01", 5.33),
            ],
        );

        let summary = merge_staged(&staging).unwrap();
        assert_eq!(summary.series, ["DGS10", "FEDFUNDS", "UNRATE"]);

        let df = read_merged(&staging.merged_path()).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            names,
            [
                "cik",
                "company",
                "form_type",
                "filed",
                "accession",
                "period_of_report",
                "DGS10",
                "FEDFUNDS",
                "UNRATE"
            ]
        );

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn missing_indicator_input_leaves_no_output() {
        let staging = temp_staging();
        staging
            .write_filings(&[filing("0000000001", "2024-03-15")])
            .unwrap();

        let err = merge_staged(&staging).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Staging(StagingError::MissingInput { .. })
        ));
        assert!(!staging.merged_path().exists());

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn merge_is_deterministic() {
        let staging = temp_staging();
        stage(
            &staging,
            &[
                filing("0000000001", "2024-03-15"),
                filing("0000000002", "2024-02-20"),
            ],
            &[
                obs("FEDFUNDS", "2024-02-01", 5.33),
                obs("FEDFUNDS", "2024-03-01", 5.33),
                obs("UNRATE", "2024-02-01", 3.9),
            ],
        );

        merge_staged(&staging).unwrap();
        let first = fs::read(staging.merged_path()).unwrap();
        merge_staged(&staging).unwrap();
        let second = fs::read(staging.merged_path()).unwrap();

        assert_eq!(first, second);

        let _ = fs::remove_dir_all(staging.dir());
    }

    #[test]
    fn filed_dates_roundtrip_through_parquet() {
        let staging = temp_staging();
        stage(
            &staging,
            &[filing("0000000001", "2024-03-15")],
            &[obs("FEDFUNDS", "2024-03-01", 5.33)],
        );

        merge_staged(&staging).unwrap();
        let df = read_merged(&staging.merged_path()).unwrap();

        let epoch = d("1970-01-01");
        let filed = df.column("filed").unwrap().date().unwrap();
        let days = filed.get(0).unwrap();
        assert_eq!(epoch + chrono::Duration::days(i64::from(days)), d("2024-03-15"));

        let _ = fs::remove_dir_all(staging.dir());
    }
}
