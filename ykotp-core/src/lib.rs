// File:    lib.rs
//
// Description: The main library crate for ykotp-core, a software emulation of a YubiKey OTP hardware token.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! # YubiKey OTP Core Library
//!
//! This library emulates a hardware YubiKey token operating in its native
//! OTP mode. It generates a token's secret identity material (public ID,
//! private ID, AES-128 key), tracks the session/usage counter state a real
//! token keeps in flash, and produces 32-character ModHex one-time
//! passwords on demand.
//!
//! The library only *generates* credentials and OTPs; validating an OTP
//! against a server-side counter store is out of scope.

/// CRC16-CCITT checksum over OTP plaintext blocks.
pub mod crc;
/// Random material sourced from the platform RNG.
pub mod entropy;
/// Error types surfaced by the public API.
pub mod error;
/// ModHex encoding and decoding of identifiers and OTPs.
pub mod modhex;
/// Builds and encrypts the one-time-password block.
mod otp;
/// The token record, its mutation rules, and its persistence formats.
pub mod token;

pub use error::TokenError;
pub use token::{Token, TokenRecord};
