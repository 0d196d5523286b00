//! Body fingerprints for exact-duplicate detection.

use sha2::{Digest, Sha256};

/// SHA-256 of a body with each line trimmed and blank lines dropped.
///
/// Returns `None` for bodies with no content, which are never duplicates.
#[must_use]
pub fn body_fingerprint(body: &str) -> Option<String> {
    let mut hasher = Sha256::new();
    let mut any = false;

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
        any = true;
    }

    any.then(|| format!("{:x}", hasher.finalize()))
}
