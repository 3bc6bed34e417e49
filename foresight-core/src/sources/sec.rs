//! SEC EDGAR filings client.
//!
//! Queries EDGAR full-text search for the most recent filings of the
//! configured form types. EDGAR rejects anonymous clients, so the declared
//! User-Agent contact string is part of the configuration rather than a
//! hardcoded default buried in the client.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{http_client, SourceError, SourceKind};
use crate::filings::FilingRecord;

const FULL_TEXT_SEARCH_URL: &str = "https://efts.sec.gov/LATEST/search-index";

/// SEC fetcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecConfig {
    /// Declared User-Agent, e.g. "foresight-pipeline data@example.com".
    pub user_agent: String,
    /// Form types to request.
    pub forms: Vec<String>,
    /// How many days of filings to request, ending at the logical date.
    pub window_days: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Endpoint override, for pointing the client at a local stand-in.
    pub endpoint: String,
}

impl Default for SecConfig {
    fn default() -> Self {
        Self {
            user_agent: "foresight-pipeline data@foresight.dev".to_string(),
            forms: vec!["10-K".to_string(), "10-Q".to_string()],
            window_days: 7,
            timeout_secs: 30,
            endpoint: FULL_TEXT_SEARCH_URL.to_string(),
        }
    }
}

/// EDGAR full-text search response (the subset we consume).
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    /// "{accession}:{primary-document}"
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    ciks: Vec<String>,
    display_names: Vec<String>,
    #[serde(rename = "file_type")]
    form_type: String,
    file_date: String,
    #[serde(default)]
    period_ending: Option<String>,
}

/// SEC EDGAR client.
pub struct EdgarClient {
    client: reqwest::blocking::Client,
    config: SecConfig,
}

impl EdgarClient {
    pub fn new(config: SecConfig) -> Self {
        let client = http_client(&config.user_agent, Duration::from_secs(config.timeout_secs));
        Self { client, config }
    }

    /// Fetch filings of the configured form types filed in the window ending
    /// at `as_of` (inclusive).
    ///
    /// One attempt per call; retry policy belongs to the scheduler driving
    /// the pipeline.
    pub fn fetch_recent(&self, as_of: NaiveDate) -> Result<Vec<FilingRecord>, SourceError> {
        let start = as_of - chrono::Duration::days(i64::from(self.config.window_days));
        let forms = self.config.forms.join(",");
        let start_s = start.to_string();
        let end_s = as_of.to_string();
        info!(start = %start_s, end = %end_s, forms = %forms, "requesting EDGAR filings");

        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("q", "*"),
                ("forms", forms.as_str()),
                ("dateRange", "custom"),
                ("startdt", start_s.as_str()),
                ("enddt", end_s.as_str()),
            ])
            .send()
            .map_err(|e| SourceError::Fetch {
                source: SourceKind::Sec,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Fetch {
                source: SourceKind::Sec,
                reason: format!("HTTP {status} from EDGAR"),
            });
        }

        let body: SearchResponse = resp.json().map_err(|e| SourceError::Parse {
            source: SourceKind::Sec,
            reason: format!("search response did not decode: {e}"),
        })?;

        let records = parse_hits(body)?;
        info!(count = records.len(), "EDGAR filings fetched");
        Ok(records)
    }
}

/// Convert search hits into filing records.
///
/// Hits without a CIK are skipped with a warning; a hit with an undecodable
/// date is a schema change and fails the whole fetch.
fn parse_hits(resp: SearchResponse) -> Result<Vec<FilingRecord>, SourceError> {
    let mut records = Vec::with_capacity(resp.hits.hits.len());

    for hit in resp.hits.hits {
        let cik = match hit.source.ciks.first() {
            Some(cik) => cik.clone(),
            None => {
                warn!(id = %hit.id, "skipping EDGAR hit without a CIK");
                continue;
            }
        };

        let accession = hit
            .id
            .split(':')
            .next()
            .unwrap_or(hit.id.as_str())
            .to_string();

        let filed = parse_edgar_date(&hit.source.file_date)?;
        let period_of_report = match hit.source.period_ending.as_deref() {
            Some(s) if !s.is_empty() => Some(parse_edgar_date(s)?),
            _ => None,
        };

        records.push(FilingRecord {
            cik,
            company: hit
                .source
                .display_names
                .first()
                .cloned()
                .unwrap_or_default(),
            form_type: hit.source.form_type,
            filed,
            accession,
            period_of_report,
        });
    }

    Ok(records)
}

fn parse_edgar_date(raw: &str) -> Result<NaiveDate, SourceError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| SourceError::Parse {
        source: SourceKind::Sec,
        reason: format!("bad EDGAR date '{raw}': {e}"),
    })
}
