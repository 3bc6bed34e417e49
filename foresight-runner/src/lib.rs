//! Foresight pipeline runner, the orchestrator-facing surface.
//!
//! Exposes exactly three invocable operations (fetch-SEC, fetch-FRED, merge)
//! plus the explicit task graph that encodes their ordering. Scheduling
//! policy (calendars, retries, timeouts, the upload of the merged artifact
//! to durable storage) belongs to whatever drives these operations, not to
//! this crate.

pub mod config;
pub mod graph;
pub mod manifest;
pub mod run;
pub mod tasks;
