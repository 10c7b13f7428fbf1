//! Opaque token material: generation, hashing, prefixes.
//!
//! Tokens are stored only by their blake3 hash; the first 8 plaintext
//! characters are kept for operator identification. API keys carry the
//! `mbk_` prefix so the Bearer route can distinguish them from session
//! tokens lexically.

use rand::RngCore;

use mashbank_core::constants::{API_KEY_PREFIX, TOKEN_PREFIX_LEN};

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Mint a fresh API key.
pub fn generate_api_key() -> String {
    format!("{API_KEY_PREFIX}{}", random_hex(24))
}

/// Mint a fresh session token.
pub fn generate_session_token() -> String {
    random_hex(32)
}

/// Stored form of any opaque token.
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Plaintext prefix kept alongside the hash.
pub fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LEN).collect()
}

/// Whether a bearer token is an API key rather than a session token.
pub fn is_api_key(token: &str) -> bool {
    token.starts_with(API_KEY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_shape() {
        let key = generate_api_key();
        assert!(is_api_key(&key));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + 48);
        assert_ne!(generate_api_key(), key);
    }

    #[test]
    fn test_session_token_is_not_api_key() {
        assert!(!is_api_key(&generate_session_token()));
    }

    #[test]
    fn test_prefix_and_hash() {
        let key = generate_api_key();
        assert_eq!(token_prefix(&key).len(), TOKEN_PREFIX_LEN);
        assert!(key.starts_with(&token_prefix(&key)));
        assert_eq!(hash_token(&key).len(), 64);
        assert_ne!(hash_token(&key), key);
    }
}
