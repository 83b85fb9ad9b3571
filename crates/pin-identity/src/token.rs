//! Random token generation.
//!
//! Uses the operating system's cryptographic random source via `rand`.
//! Tokens are `pin:` followed by unpadded URL-safe base64.

use base64::Engine;
use rand::RngCore;

/// Prefix carried by every generated token.
pub const TOKEN_PREFIX: &str = "pin:";

/// Random bytes behind a domain challenge token.
pub const DOMAIN_TOKEN_BYTES: usize = 12;

/// Random bytes behind a private capability token.
pub const PRIVATE_TOKEN_BYTES: usize = 32;

/// Generate a URL-safe token from `n` random bytes.
pub fn random_token(n: usize) -> String {
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    format!(
        "{TOKEN_PREFIX}{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&buf)
    )
}

/// Token for a new domain verification row.
pub fn domain_token() -> String {
    random_token(DOMAIN_TOKEN_BYTES)
}

/// Token that scopes access to an identity's private view.
pub fn private_token() -> String {
    random_token(PRIVATE_TOKEN_BYTES)
}
