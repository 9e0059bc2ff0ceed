//! Domain building blocks for the firmware OTA backend.
//!
//! - [`error::CoreError`] -- domain error taxonomy shared by every crate.
//! - [`hashing`] -- SHA-256 digests for firmware artifacts.
//! - [`firmware`] -- publish and report business rules (pure functions).
//! - [`artifact_store::ArtifactStore`] -- durable placement of firmware binaries.

pub mod artifact_store;
pub mod error;
pub mod firmware;
pub mod hashing;
pub mod pagination;
pub mod types;
