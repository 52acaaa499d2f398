//! Random tokens for sessions, CSRF protection and OAuth state.
//!
//! Raw session tokens only ever live in the client's cookie. The database
//! stores `SHA-256(secret || token)`, so a leaked sessions table cannot be
//! replayed without the server secret.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes in a token (hex-encoded to twice as many chars).
pub const TOKEN_BYTES: usize = 32;

/// Generate a random 32-byte token encoded as hex (64 characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derive the storage key for a session token.
pub fn hash_session_token(secret: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0u8]);
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two tokens without short-circuiting on the first mismatch.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_depends_on_secret() {
        let token = generate_token();
        let a = hash_session_token("secret-a", &token);
        let b = hash_session_token("secret-b", &token);
        assert_ne!(a, b);
        assert_eq!(a, hash_session_token("secret-a", &token));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc12"));
    }
}
