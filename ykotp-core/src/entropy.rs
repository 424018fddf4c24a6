//! All random material comes from the operating system RNG. A failure to
//! read entropy is fatal for the operation that needed it; it is never
//! retried and never papered over with a weaker source.

use rand::{TryRngCore, rngs::OsRng};

use crate::error::TokenError;

/// Fills `buffer` with cryptographically random bytes.
///
/// # Errors
///
/// Returns [`TokenError::Entropy`] if the platform RNG is unavailable.
pub fn fill_random(buffer: &mut [u8]) -> Result<(), TokenError> {
    OsRng
        .try_fill_bytes(buffer)
        .map_err(|_| TokenError::Entropy)
}

/// Draws one random `u32`.
///
/// # Errors
///
/// Returns [`TokenError::Entropy`] if the platform RNG is unavailable.
pub fn random_u32() -> Result<u32, TokenError> {
    let mut bytes = [0u8; 4];
    fill_random(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Draws one random `u16`.
///
/// # Errors
///
/// Returns [`TokenError::Entropy`] if the platform RNG is unavailable.
pub fn random_u16() -> Result<u16, TokenError> {
    let mut bytes = [0u8; 2];
    fill_random(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}
