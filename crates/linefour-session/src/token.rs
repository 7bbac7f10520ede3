//! Capability tokens.
//!
//! A token is the only thing standing between a stranger and a game, so
//! it must be unguessable. Tokens are drawn from `rand`'s thread-local
//! CSPRNG and rendered as lowercase hex, which is safe to drop into a URL
//! without escaping.

use rand::Rng;

/// Generates a random token from `bytes` bytes of entropy.
///
/// The result is `2 * bytes` hex characters long. With the default of 16
/// bytes (128 bits) a collision with any live token is never expected,
/// so none is checked for.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(&mut buf[..]);
    hex::encode(buf)
}
