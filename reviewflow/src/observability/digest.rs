//! Artifact fingerprints for logs and events.
//!
//! Artifacts can be large and may hold user content, so logs carry a short
//! digest instead of the text.

use sha2::{Digest, Sha256};

/// Returns the first 16 bytes of the SHA-256 of `artifact`, hex encoded.
#[must_use]
pub fn artifact_digest(artifact: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(artifact.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
