// File:    modhex.rs
//
// Description: ModHex, the keyboard-layout-independent hexadecimal variant used by YubiKey tokens.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! ModHex maps each 4-bit nibble to one of 16 characters chosen to sit on
//! the same scancodes across all common keyboard layouts, so a token
//! acting as a USB keyboard types the same string everywhere.

use crate::error::TokenError;

/// The 16 ModHex characters, indexed by nibble value `0x0..=0xf`.
pub const ALPHABET: [u8; 16] = *b"cbdefghijklnrtuv";

/// Encodes bytes as a ModHex string, high nibble first.
///
/// The output is always exactly twice as long as the input.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(char::from(ALPHABET[usize::from(byte >> 4)]));
        out.push(char::from(ALPHABET[usize::from(byte & 0x0f)]));
    }
    out
}

/// Decodes a ModHex string back into bytes.
///
/// # Errors
///
/// Returns [`TokenError::InvalidEncoding`] if the input has odd length or
/// contains any character outside the ModHex alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, TokenError> {
    if input.len() % 2 != 0 {
        return Err(TokenError::InvalidEncoding {
            reason: format!("odd length {}", input.len()),
        });
    }

    let mut out = Vec::with_capacity(input.len() / 2);
    for pair in input.as_bytes().chunks_exact(2) {
        let high = nibble(pair[0])?;
        let low = nibble(pair[1])?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

/// Looks up the nibble value of one ModHex character.
fn nibble(character: u8) -> Result<u8, TokenError> {
    ALPHABET
        .iter()
        .position(|&entry| entry == character)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| TokenError::InvalidEncoding {
            reason: format!("character {:?} is not modhex", char::from(character)),
        })
}
