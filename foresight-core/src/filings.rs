//! Regulatory filing records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One regulatory filing as staged by the SEC fetcher.
///
/// Immutable once written; the next scheduled run overwrites the whole
/// staged file rather than appending to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// SEC Central Index Key of the filing entity.
    pub cik: String,
    /// Display name of the filing entity.
    pub company: String,
    /// Form type, e.g. "10-K" or "10-Q".
    pub form_type: String,
    /// Date the filing was filed with the SEC.
    pub filed: NaiveDate,
    /// EDGAR accession number, unique per filing.
    pub accession: String,
    /// Reporting period the filing covers, when EDGAR provides one.
    pub period_of_report: Option<NaiveDate>,
}
