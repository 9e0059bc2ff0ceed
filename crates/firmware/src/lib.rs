//! Firmware OTA distribution: publish, serve and collect rollout reports.
//!
//! - [`registry::FirmwareRegistry`] -- publish rules and catalog queries.
//! - [`collector::ReportCollector`] -- append-only device report log.
//! - [`service::OtaService`] -- the orchestrator HTTP handlers call into.
//! - [`catalog`] / [`report_log`] -- storage seams with Postgres implementations.

pub mod catalog;
pub mod collector;
pub mod error;
pub mod registry;
pub mod report_log;
pub mod service;

#[cfg(test)]
mod testing;

pub use collector::{NewReport, ReportCollector};
pub use error::OtaError;
pub use registry::{FirmwareRegistry, FirmwareSettings, PublishRequest};
pub use service::{FirmwareDownload, OtaService};
