//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` (or an open transaction) as the first argument.

pub mod firmware_report_repo;
pub mod firmware_repo;

pub use firmware_report_repo::FirmwareReportRepo;
pub use firmware_repo::FirmwareRepo;
