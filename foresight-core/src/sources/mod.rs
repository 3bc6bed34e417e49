//! Source clients for the two upstream data providers.
//!
//! Each client makes exactly one attempt per call and classifies failures so
//! the scheduler driving the pipeline can decide what to retry: a `Fetch`
//! failure is transient (source unreachable, bad status), a `Parse` failure
//! means the upstream payload no longer matches the expected schema and a
//! retry will not help without a schema fix.

pub mod fred;
pub mod sec;

use std::time::Duration;
use thiserror::Error;

/// Which upstream source an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sec,
    Fred,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Sec => "sec",
            SourceKind::Fred => "fred",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for SourceKind {}

/// Structured error type for source fetches.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source was unreachable or rejected the request.
    #[error("{source} fetch failed: {reason}")]
    Fetch { source: SourceKind, reason: String },

    /// The source answered with a payload that does not match the expected
    /// schema.
    #[error("{source} returned an unexpected payload: {reason}")]
    Parse { source: SourceKind, reason: String },
}

impl SourceError {
    /// Whether a scheduler-side retry can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Fetch { .. })
    }
}

/// Build the blocking HTTP client the source clients share.
pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .expect("failed to build HTTP client")
}
