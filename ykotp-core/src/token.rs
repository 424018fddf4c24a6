// File:    token.rs
//
// Description: The token record, its counter mutation rules, and its persistence formats.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! A [`Token`] models one physical-or-virtual credential. Its identity
//! material (public ID, private ID, AES key) is fixed at generation;
//! only the counters, the timer fields, and the per-generation random
//! filler mutate, and only through OTP generation.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TokenError;
use crate::{entropy, modhex, otp};

/// Width of the cleartext public identifier.
pub const PUBLIC_ID_LEN: usize = 6;
/// Width of the secret private identifier embedded in every OTP block.
pub const PRIVATE_ID_LEN: usize = 6;
/// Width of the AES-128 key.
pub const KEY_LEN: usize = 16;
/// Width of the packed binary token record.
pub const RECORD_LEN: usize = 56;

/// Ceiling of the session counter. Hardware tokens reserve the top bit
/// of the field, so a token is spent once the counter reaches this.
pub const SESSION_COUNTER_MAX: u16 = 0x7fff;
/// Ceiling of the per-session usage counter.
pub const USAGE_COUNTER_MAX: u8 = 0xff;

/// First two public-id bytes of every generated token, "dd" twice in
/// ModHex. Marks the credential as software-issued so it cannot collide
/// with a factory-programmed serial.
const SOFT_TOKEN_PREFIX: [u8; 2] = [0x22, 0x22];

/// Mask that clears the sub-second nibble of the power-on random value.
const PONRAND_SECOND_MASK: u32 = 0xffff_fff0;

/// The 24-bit wrap of the 8 Hz timer.
const TIMER_WRAP: u64 = 0x00ff_ffff;

/// Every persistent field of one token, with explicit widths.
///
/// This is a plain structured record; [`TokenRecord::pack`] and
/// [`TokenRecord::unpack`] define its only binary representation. Callers
/// normally hold a [`Token`] and never touch the record directly, but the
/// fields are public so a counter store or test can inspect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Cleartext identifier, transmitted as a ModHex prefix to the OTP.
    pub public_id: [u8; PUBLIC_ID_LEN],
    /// Secret identifier inside the encrypted OTP payload.
    pub private_id: [u8; PRIVATE_ID_LEN],
    /// AES-128 key encrypting every OTP block. Never mutated.
    pub aes_key: [u8; KEY_LEN],
    /// Increments when the usage counter rolls over; a real token
    /// increments it at every power-up.
    pub session_counter: u16,
    /// Increments on every OTP within a session; resets on rollover.
    pub usage_counter: u8,
    /// Low 16 bits of the 24-bit 8 Hz timestamp.
    pub timestamp_low: u16,
    /// High 8 bits of the 24-bit 8 Hz timestamp.
    pub timestamp_high: u8,
    /// Per-generation random filler, refreshed on every OTP.
    pub last_random: u16,
    /// Power-on random timer offset. Keeps distinct tokens from being
    /// synchronized to the wall clock; refreshed on session rollover.
    pub poweron_random: u32,
    /// Unix seconds when the token was generated ("first power-on").
    pub created: i64,
    /// Unix seconds of the most recent OTP.
    pub last_use: i64,
}

impl TokenRecord {
    /// Allocates a record with fresh random identity material, counters
    /// zeroed, and the timestamp at 0.
    fn generate(now: i64) -> Result<Self, TokenError> {
        let mut public_id = [0u8; PUBLIC_ID_LEN];
        public_id[..SOFT_TOKEN_PREFIX.len()].copy_from_slice(&SOFT_TOKEN_PREFIX);
        entropy::fill_random(&mut public_id[SOFT_TOKEN_PREFIX.len()..])?;

        let mut private_id = [0u8; PRIVATE_ID_LEN];
        entropy::fill_random(&mut private_id)?;

        let mut aes_key = [0u8; KEY_LEN];
        entropy::fill_random(&mut aes_key)?;

        Ok(Self {
            public_id,
            private_id,
            aes_key,
            session_counter: 0,
            usage_counter: 0,
            timestamp_low: 0,
            timestamp_high: 0,
            last_random: entropy::random_u16()?,
            poweron_random: entropy::random_u32()? & PONRAND_SECOND_MASK,
            created: now,
            last_use: now,
        })
    }

    /// Commits one OTP generation: counters, timer, random filler.
    ///
    /// Nothing is mutated on failure, so an exhausted token fails every
    /// subsequent call the same way.
    pub(crate) fn advance(&mut self, now: i64) -> Result<(), TokenError> {
        if self.usage_counter == USAGE_COUNTER_MAX {
            if self.session_counter == SESSION_COUNTER_MAX {
                warn!("token {} exhausted its session counter", modhex::encode(&self.public_id));
                return Err(TokenError::CounterExhausted);
            }
            self.session_counter += 1;
            self.usage_counter = 0;
            self.poweron_random = entropy::random_u32()? & PONRAND_SECOND_MASK;
            debug!("usage counter wrapped, session counter now {}", self.session_counter);
        } else {
            self.usage_counter += 1;
        }

        // A hardware token ticks at 8 Hz; with only second resolution
        // available, same-second generations instead bump the sub-second
        // nibble of the power-on random so the timestamp still moves.
        // The nibble is held below one tick's worth of seconds (8): once
        // it is full, the bump carries past the nibble, so clearing the
        // nibble at the next second boundary (at most -7) can never
        // outweigh that second's +8 and the timestamp never steps back.
        if self.last_use == now {
            if (self.poweron_random & !PONRAND_SECOND_MASK) < 7 {
                self.poweron_random = self.poweron_random.wrapping_add(1);
            } else {
                self.poweron_random =
                    (self.poweron_random & PONRAND_SECOND_MASK).wrapping_add(0x10);
            }
        } else {
            self.last_use = now;
            self.poweron_random &= PONRAND_SECOND_MASK;
        }

        let elapsed = u64::try_from(now.saturating_sub(self.created)).unwrap_or(0);
        let ticks = elapsed
            .wrapping_mul(8)
            .wrapping_add(u64::from(self.poweron_random))
            % TIMER_WRAP;
        let tick_bytes = ticks.to_le_bytes();
        self.timestamp_low = u16::from_le_bytes([tick_bytes[0], tick_bytes[1]]);
        self.timestamp_high = tick_bytes[2];

        self.last_random = entropy::random_u16()?;
        Ok(())
    }

    /// Packs the record into its fixed-width binary form.
    ///
    /// Multi-byte fields are little-endian, in declaration order. The
    /// buffer is a private memory layout for suspend/resume, not the OTP
    /// wire format; callers must treat it as opaque bytes.
    #[must_use]
    pub fn pack(&self) -> [u8; RECORD_LEN] {
        let mut buffer = [0u8; RECORD_LEN];
        buffer[0..6].copy_from_slice(&self.public_id);
        buffer[6..12].copy_from_slice(&self.private_id);
        buffer[12..28].copy_from_slice(&self.aes_key);
        buffer[28..30].copy_from_slice(&self.session_counter.to_le_bytes());
        buffer[30] = self.usage_counter;
        buffer[31..33].copy_from_slice(&self.timestamp_low.to_le_bytes());
        buffer[33] = self.timestamp_high;
        buffer[34..36].copy_from_slice(&self.last_random.to_le_bytes());
        buffer[36..40].copy_from_slice(&self.poweron_random.to_le_bytes());
        buffer[40..48].copy_from_slice(&self.created.to_le_bytes());
        buffer[48..56].copy_from_slice(&self.last_use.to_le_bytes());
        buffer
    }

    /// Unpacks a record previously produced by [`TokenRecord::pack`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MalformedState`] if the buffer has the wrong
    /// length or holds an impossible counter value.
    pub fn unpack(bytes: &[u8]) -> Result<Self, TokenError> {
        if bytes.len() != RECORD_LEN {
            return Err(TokenError::MalformedState {
                reason: format!("record is {} bytes, expected {RECORD_LEN}", bytes.len()),
            });
        }

        let mut public_id = [0u8; PUBLIC_ID_LEN];
        public_id.copy_from_slice(&bytes[0..6]);
        let mut private_id = [0u8; PRIVATE_ID_LEN];
        private_id.copy_from_slice(&bytes[6..12]);
        let mut aes_key = [0u8; KEY_LEN];
        aes_key.copy_from_slice(&bytes[12..28]);

        let session_counter = u16::from_le_bytes([bytes[28], bytes[29]]);
        if session_counter > SESSION_COUNTER_MAX {
            return Err(TokenError::MalformedState {
                reason: format!("session counter {session_counter:#06x} above ceiling"),
            });
        }

        Ok(Self {
            public_id,
            private_id,
            aes_key,
            session_counter,
            usage_counter: bytes[30],
            timestamp_low: u16::from_le_bytes([bytes[31], bytes[32]]),
            timestamp_high: bytes[33],
            last_random: u16::from_le_bytes([bytes[34], bytes[35]]),
            poweron_random: u32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]),
            created: i64::from_le_bytes([
                bytes[40], bytes[41], bytes[42], bytes[43], bytes[44], bytes[45], bytes[46],
                bytes[47],
            ]),
            last_use: i64::from_le_bytes([
                bytes[48], bytes[49], bytes[50], bytes[51], bytes[52], bytes[53], bytes[54],
                bytes[55],
            ]),
        })
    }
}

/// One OTP credential: the persistent record plus memoized display forms
/// of its identity fields.
///
/// `generate_otp` takes `&mut self`, so the borrow checker already
/// enforces the one-in-flight-generation-per-token rule; wrap the token
/// in a mutex if it must be shared across threads. Distinct tokens are
/// fully independent.
pub struct Token {
    record: TokenRecord,
    public_id: OnceCell<String>,
    private_id: OnceCell<String>,
    aes_key: OnceCell<String>,
}

impl Token {
    /// Generates a brand-new token with fresh random identity material.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Entropy`] if the platform RNG is
    /// unavailable.
    pub fn generate() -> Result<Self, TokenError> {
        let record = TokenRecord::generate(unix_now())?;
        debug!("generated token with public id {}", modhex::encode(&record.public_id));
        Ok(Self::from_record(record))
    }

    /// Wraps an existing record, e.g. one restored from persistence.
    #[must_use]
    pub const fn from_record(record: TokenRecord) -> Self {
        Self {
            record,
            public_id: OnceCell::new(),
            private_id: OnceCell::new(),
            aes_key: OnceCell::new(),
        }
    }

    /// The underlying persistent record.
    #[must_use]
    pub const fn record(&self) -> &TokenRecord {
        &self.record
    }

    /// The public identifier, ModHex-encoded. Computed once and cached;
    /// the underlying bytes never change after generation.
    #[must_use]
    pub fn public_id(&self) -> &str {
        self.public_id
            .get_or_init(|| modhex::encode(&self.record.public_id))
    }

    /// The private identifier, hex-encoded. Computed once and cached.
    #[must_use]
    pub fn private_id(&self) -> &str {
        self.private_id
            .get_or_init(|| hex::encode(self.record.private_id))
    }

    /// The AES key, hex-encoded, for provisioning a verifier. Computed
    /// once and cached; this accessor is the only way the key leaves the
    /// token.
    #[must_use]
    pub fn aes_key(&self) -> &str {
        self.aes_key.get_or_init(|| hex::encode(self.record.aes_key))
    }

    /// Produces the next one-time password: 32 ModHex characters.
    ///
    /// The OTP is built from the current state, then the state advance is
    /// committed. If the advance fails the computed OTP is discarded and
    /// the failure returned instead, so no OTP is ever issued whose state
    /// could not be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::CounterExhausted`] once the token is spent,
    /// or [`TokenError::Entropy`] if the RNG fails mid-advance.
    pub fn generate_otp(&mut self) -> Result<String, TokenError> {
        let otp = otp::emit(&self.record)?;
        self.record.advance(unix_now())?;
        Ok(otp)
    }

    /// Produces the full keyboard form a hardware token would type: the
    /// ModHex public id followed by the 32-character OTP, 44 characters
    /// total.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Token::generate_otp`].
    pub fn generate_prefixed_otp(&mut self) -> Result<String, TokenError> {
        let otp = self.generate_otp()?;
        Ok(format!("{}{otp}", self.public_id()))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Eq for Token {}

// The derived form would print the AES key and private id.
impl fmt::Debug for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Token")
            .field("public_id", &self.public_id())
            .field("session_counter", &self.record.session_counter)
            .field("usage_counter", &self.record.usage_counter)
            .field("private_id", &"<redacted>")
            .field("aes_key", &"<redacted>")
            .finish()
    }
}

// The structured form is a single opaque base64 byte-string wrapping the
// packed binary record, so a token embeds in a JSON document without
// exposing its layout.
impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(self.record.pack()))
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(&encoded).map_err(D::Error::custom)?;
        let record = TokenRecord::unpack(&bytes).map_err(D::Error::custom)?;
        Ok(Self::from_record(record))
    }
}

/// Wall-clock seconds since the Unix epoch.
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
