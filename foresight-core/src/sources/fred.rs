//! FRED indicator series client.
//!
//! Fetches observations for each configured series over a bounded lookback
//! window, only enough history to support the point-in-time join downstream
//! rather than the full series. FRED reports missing observations as "."
//! in the value field; those are skipped rather than staged as zeros.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::{http_client, SourceError, SourceKind};
use crate::indicators::IndicatorObservation;

const OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// FRED fetcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FredConfig {
    /// FRED API key. Where it comes from (env, secret store) is the
    /// caller's business; the core only sees the value.
    pub api_key: String,
    /// Series to request.
    pub series: Vec<String>,
    /// Lookback window in days. Observations earlier than
    /// `as_of - lookback_days` are not requested; the window must cover the
    /// longest plausible filing-date range of the paired SEC fetch.
    pub lookback_days: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Endpoint override, for pointing the client at a local stand-in.
    pub endpoint: String,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            series: vec![
                "FEDFUNDS".to_string(),
                "CPIAUCSL".to_string(),
                "UNRATE".to_string(),
                "DGS10".to_string(),
            ],
            lookback_days: 730,
            timeout_secs: 30,
            endpoint: OBSERVATIONS_URL.to_string(),
        }
    }
}

/// FRED observations response (the subset we consume).
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

/// FRED API client.
pub struct FredClient {
    client: reqwest::blocking::Client,
    config: FredConfig,
}

impl FredClient {
    pub fn new(config: FredConfig) -> Self {
        let client = http_client("foresight-pipeline", Duration::from_secs(config.timeout_secs));
        Self { client, config }
    }

    /// Fetch all configured series over the lookback window ending at
    /// `as_of`. Returns long-form observations: series in configured order,
    /// dates ascending within each series.
    pub fn fetch_series(&self, as_of: NaiveDate) -> Result<Vec<IndicatorObservation>, SourceError> {
        let start = as_of - chrono::Duration::days(i64::from(self.config.lookback_days));
        let mut out = Vec::new();

        for series_id in &self.config.series {
            let observations = self.fetch_one(series_id, start, as_of)?;
            info!(series = %series_id, count = observations.len(), "FRED series fetched");
            out.extend(observations);
        }

        Ok(out)
    }

    fn fetch_one(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IndicatorObservation>, SourceError> {
        let start_s = start.to_string();
        let end_s = end.to_string();

        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.config.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start_s.as_str()),
                ("observation_end", end_s.as_str()),
                ("sort_order", "asc"),
            ])
            .send()
            .map_err(|e| SourceError::Fetch {
                source: SourceKind::Fred,
                reason: format!("{series_id}: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Fetch {
                source: SourceKind::Fred,
                reason: format!("HTTP {status} from FRED for {series_id}"),
            });
        }

        let body: ObservationsResponse = resp.json().map_err(|e| SourceError::Parse {
            source: SourceKind::Fred,
            reason: format!("observations for {series_id} did not decode: {e}"),
        })?;

        parse_observations(series_id, body)
    }
}

fn parse_observations(
    series_id: &str,
    body: ObservationsResponse,
) -> Result<Vec<IndicatorObservation>, SourceError> {
    let mut out = Vec::with_capacity(body.observations.len());

    for obs in body.observations {
        // "." marks a missing observation.
        let value = match parse_value(&obs.value) {
            Some(v) => v,
            None => continue,
        };
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
            SourceError::Parse {
                source: SourceKind::Fred,
                reason: format!("bad observation date '{}' in {series_id}: {e}", obs.date),
            }
        })?;
        out.push(IndicatorObservation {
            series_id: series_id.to_string(),
            date,
            value,
        });
    }

    Ok(out)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let value = trimmed.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_observations_skips_missing_markers() {
        let body: ObservationsResponse = serde_json::from_str(
            r#"{
                "observations": [
                    {"date": "2024-01-01", "value": "5.33"},
                    {"date": "2024-01-02", "value": "."},
                    {"date": "2024-01-03", "value": "5.35"}
                ]
            }"#,
        )
        .unwrap();

        let obs = parse_observations("FEDFUNDS", body).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].series_id, "FEDFUNDS");
        assert_eq!(obs[0].value, 5.33);
        assert_eq!(obs[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn bad_observation_date_is_a_parse_failure() {
        let body: ObservationsResponse = serde_json::from_str(
            r#"{"observations": [{"date": "Jan 1 2024", "value": "5.33"}]}"#,
        )
        .unwrap();

        let err = parse_observations("FEDFUNDS", body).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn parse_value_handles_sentinels() {
        assert_eq!(parse_value("3.1"), Some(3.1));
        assert_eq!(parse_value(" 3.1 "), Some(3.1));
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("not a number"), None);
    }

    #[test]
    fn default_config_is_documented() {
        let config = FredConfig::default();
        assert_eq!(config.series, ["FEDFUNDS", "CPIAUCSL", "UNRATE", "DGS10"]);
        assert_eq!(config.lookback_days, 730);
        assert!(config.endpoint.contains("api.stlouisfed.org"));
    }
}
