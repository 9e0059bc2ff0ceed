//! Request extractors.
//!
//! - [`admin::RequireAdmin`] -- HTTP Basic admin authentication.
//! - [`client_ip::ClientIp`] -- best-effort remote address of the caller.

pub mod admin;
pub mod client_ip;
