//! Content hashing: streaming blake3, hex-64 identifiers.

use crate::errors::{ContainerError, MashResult};

/// Byte length of a raw content hash.
pub const HASH_LEN: usize = 32;

/// Character length of a hex-encoded content hash.
pub const HASH_HEX_LEN: usize = 64;

/// Check that a string is a 64-character hex digest (either case).
pub fn is_hex64(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate and lowercase a content hash, the canonical stored form.
pub fn canonical_hash(s: &str) -> MashResult<String> {
    if !is_hex64(s) {
        return Err(ContainerError::InvalidHash { hash: s.to_string() }.into());
    }
    Ok(s.to_ascii_lowercase())
}

/// Incremental content hasher. Wraps blake3 so the algorithm choice
/// stays in one place; the chain hash uses the same construction.
pub struct ContentHasher {
    inner: blake3::Hasher,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.bytes += data.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn count(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the lowercase hex digest.
    pub fn finish_hex(self) -> String {
        self.inner.finalize().to_hex().to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash an entire byte slice to lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// One step of the per-container running chain:
/// `H_i = blake3(H_{i-1} || header || data)`.
pub fn chain_step(prev: &[u8; HASH_LEN], header: &[u8], data: &[u8]) -> [u8; HASH_LEN] {
    let mut h = blake3::Hasher::new();
    h.update(prev);
    h.update(header);
    h.update(data);
    *h.finalize().as_bytes()
}

/// The zero chain state `H_0`.
pub fn chain_zero() -> [u8; HASH_LEN] {
    [0u8; HASH_LEN]
}

/// Hex-encode a raw chain state.
pub fn chain_hex(state: &[u8; HASH_LEN]) -> String {
    let mut out = String::with_capacity(HASH_HEX_LEN);
    for b in state {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex64_validation() {
        let h = hash_bytes(b"hello");
        assert!(is_hex64(&h));
        assert!(!is_hex64("abc"));
        assert!(!is_hex64(&"z".repeat(64)));
        assert!(is_hex64(&h.to_ascii_uppercase()));
    }

    #[test]
    fn test_canonical_lowercases() {
        let h = hash_bytes(b"hello").to_ascii_uppercase();
        assert_eq!(canonical_hash(&h).unwrap(), h.to_ascii_lowercase());
        assert!(canonical_hash("nope").is_err());
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let data = vec![7u8; 100_000];
        let mut hasher = ContentHasher::new();
        for chunk in data.chunks(313) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finish_hex(), hash_bytes(&data));
    }

    #[test]
    fn test_chain_is_order_sensitive() {
        let z = chain_zero();
        let a = chain_step(&z, b"h1", b"d1");
        let b = chain_step(&a, b"h2", b"d2");
        let a2 = chain_step(&z, b"h2", b"d2");
        let b2 = chain_step(&a2, b"h1", b"d1");
        assert_ne!(b, b2);
    }
}
