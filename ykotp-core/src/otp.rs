// File:    otp.rs
//
// Description: Assembles, checksums, and encrypts the one-time-password block.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! The OTP plaintext is a single 16-byte block:
//!
//! ```text
//! private id (6) | session counter LE (2) | timestamp low LE (2)
//! | timestamp high (1) | usage counter (1) | random LE (2)
//! | inverted CRC16 LE (2)
//! ```
//!
//! which is AES-128-encrypted as one raw block (the token family encrypts
//! exactly one block, so no chaining mode exists) and rendered as 32
//! ModHex characters.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};

use crate::error::TokenError;
use crate::token::{KEY_LEN, TokenRecord};
use crate::{crc, modhex};

/// One AES block, and therefore one OTP plaintext.
pub(crate) const BLOCK_LEN: usize = 16;

const CRC_LEN: usize = 2;

/// Produces the OTP string for the state held in `record`, without
/// touching that state.
pub(crate) fn emit(record: &TokenRecord) -> Result<String, TokenError> {
    let block = build_block(record)?;
    let encrypted = encrypt_block(&record.aes_key, block);
    Ok(modhex::encode(&encrypted))
}

/// Assembles the plaintext block and appends the inverted CRC.
fn build_block(record: &TokenRecord) -> Result<[u8; BLOCK_LEN], TokenError> {
    let session = record.session_counter.to_le_bytes();
    let timestamp_low = record.timestamp_low.to_le_bytes();
    let timestamp_high = [record.timestamp_high];
    let usage = [record.usage_counter];
    let random = record.last_random.to_le_bytes();
    let parts: [&[u8]; 6] = [
        &record.private_id,
        &session,
        &timestamp_low,
        &timestamp_high,
        &usage,
        &random,
    ];

    let mut block = [0u8; BLOCK_LEN];
    let mut at = 0;
    for part in parts {
        block[at..at + part.len()].copy_from_slice(part);
        at += part.len();
    }

    // Field widths must leave exactly the CRC trailer free.
    if at != BLOCK_LEN - CRC_LEN {
        return Err(TokenError::MalformedState {
            reason: format!("otp payload is {at} bytes, expected {}", BLOCK_LEN - CRC_LEN),
        });
    }

    let checksum = !crc::crc16(&block[..at]);
    block[at..].copy_from_slice(&checksum.to_le_bytes());
    Ok(block)
}

/// Encrypts one block with AES-128 under the token key.
fn encrypt_block(key: &[u8; KEY_LEN], block: [u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut state = GenericArray::from(block);
    cipher.encrypt_block(&mut state);
    state.into()
}
