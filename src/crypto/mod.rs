//! Cryptographic utilities.

pub mod token;

pub use token::{generate_token, hash_session_token, tokens_match};
