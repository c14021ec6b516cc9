//! Output generation for run reports.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`json::RunReport`] to disk for monitoring or cron wrappers
//!
//! The report is optional; the summary is always logged regardless.

pub mod json;
