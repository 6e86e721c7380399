//! Log-field redaction.
//!
//! User identifiers, file paths and similar privacy-sensitive values never
//! reach the log stream in the clear; they are replaced by a short stable
//! hash so related log lines remain correlatable.

use sha2::{Digest, Sha256};

/// Stable redacted form of a sensitive value: the first 8 bytes of its
/// SHA-256 digest, hex-encoded.
pub fn redact(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
