//! SHA-256 hex digests for firmware artifacts.
//!
//! The digest recorded in the catalog is always computed here, over the
//! exact bytes handed to the artifact store.

use sha2::{Digest, Sha256};

/// Compute a lowercase SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
