//! The CRC16-CCITT variant used across the YubiKey OTP family:
//! bit-reflected, initial value `0xffff`, polynomial `0x8408`, no final
//! xor. The OTP block stores the checksum inverted, which gives the whole
//! block a fixed residual under the same CRC.

/// Residual of a block whose trailing two bytes hold the inverted CRC of
/// the preceding bytes, little-endian. A verifier checks block integrity
/// by scanning the full block and comparing against this constant.
pub const CRC_OK_RESIDUAL: u16 = 0xf0b8;

/// Computes the CRC16-CCITT checksum of `data`.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xffff;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            let carry = crc & 1;
            crc >>= 1;
            if carry != 0 {
                crc ^= 0x8408;
            }
        }
    }
    crc
}
