//! Foresight pipeline core: fetch, stage, and merge financial data.
//!
//! The core exposes three concerns, wired together by the runner crate:
//! - Source clients for SEC EDGAR filings and FRED indicator series
//! - The staging area: fixed file names, atomic writes, validated read-back
//! - The merge: a point-in-time join of filings against indicator series,
//!   written as a parquet panel
//!
//! The core never schedules or retries anything. Every operation either
//! fully succeeds (complete output at its final path) or fully fails
//! (typed error, nothing at the final path), so an external scheduler can
//! re-invoke it any number of times without side-effect accumulation.

pub mod filings;
pub mod indicators;
pub mod merge;
pub mod sources;
pub mod staging;
