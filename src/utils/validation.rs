//! Centralized validation and fingerprint helpers.

/// Maximum number of components accepted from a single descriptor
pub const MAX_COMPONENTS: usize = 4096;

/// Check that a string is a plausible content hash: lowercase-insensitive
/// hex, between 8 (FNV-style buffer hashes) and 64 (SHA-256) characters.
#[must_use]
pub fn is_valid_content_hash(s: &str) -> bool {
    (8..=64).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize a content hash to lowercase.
/// Returns None if the input is not a valid hash.
#[must_use]
pub fn normalize_content_hash(s: &str) -> Option<String> {
    if is_valid_content_hash(s) {
        Some(s.to_lowercase())
    } else {
        None
    }
}

/// Fingerprint a raw buffer for descriptor verification.
///
/// Computes the md5 digest of the bytes as lowercase hex. Used by
/// `inspect --verify` to cross-check recorded component hashes against the
/// buffers actually on disk.
#[must_use]
pub fn compute_buffer_fingerprint(bytes: &[u8]) -> String {
    let digest = md5::compute(bytes);
    format!("{digest:x}")
}
