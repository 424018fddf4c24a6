#![allow(missing_docs)]
use ykotp_core::TokenError;
use ykotp_core::{crc, modhex};

#[test]
fn test_modhex_known_vectors() {
    assert_eq!(modhex::encode(&[]), "");
    assert_eq!(modhex::encode(&[0x22, 0x22]), "dddd");
    assert_eq!(modhex::encode(&[0x47]), "fi");
    assert_eq!(modhex::encode(&[0x00, 0xff]), "ccvv");

    assert_eq!(modhex::decode("dddd").unwrap(), vec![0x22, 0x22]);
    assert_eq!(modhex::decode("").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_modhex_roundtrip_all_byte_values() {
    let bytes = (0..=255u8).collect::<Vec<u8>>();
    let encoded = modhex::encode(&bytes);
    assert_eq!(encoded.len(), bytes.len() * 2);
    assert_eq!(modhex::decode(&encoded).unwrap(), bytes);
}

#[test]
fn test_modhex_output_stays_in_alphabet() {
    let encoded = modhex::encode(&[0xde, 0xad, 0xbe, 0xef]);
    assert!(encoded.bytes().all(|c| modhex::ALPHABET.contains(&c)));
}

#[test]
fn test_modhex_decode_rejects_foreign_characters() {
    let err = modhex::decode("zzzz").unwrap_err();
    assert!(matches!(err, TokenError::InvalidEncoding { .. }));

    // Regular hex digits outside the modhex alphabet are rejected too.
    let err = modhex::decode("abcd").unwrap_err();
    assert!(matches!(err, TokenError::InvalidEncoding { .. }));

    // Case matters: the alphabet is lowercase only.
    let err = modhex::decode("DDDD").unwrap_err();
    assert!(matches!(err, TokenError::InvalidEncoding { .. }));
}

#[test]
fn test_modhex_decode_rejects_odd_length() {
    let err = modhex::decode("abc").unwrap_err();
    assert!(matches!(err, TokenError::InvalidEncoding { .. }));

    let err = modhex::decode("c").unwrap_err();
    assert!(matches!(err, TokenError::InvalidEncoding { .. }));
}

#[test]
fn test_crc16_empty_input_is_initial_value() {
    assert_eq!(crc::crc16(&[]), 0xffff);
}

#[test]
fn test_crc16_inverted_trailer_gives_fixed_residual() {
    // A block whose last two bytes are the inverted CRC of everything
    // before them scans to the fixed residual, whatever the payload.
    for seed in [0u8, 1, 0x5a, 0xff] {
        let mut block = (0..14u8)
            .map(|index| index.wrapping_mul(31).wrapping_add(seed))
            .collect::<Vec<u8>>();
        let checksum = !crc::crc16(&block);
        block.extend_from_slice(&checksum.to_le_bytes());
        assert_eq!(crc::crc16(&block), crc::CRC_OK_RESIDUAL);
    }
}

#[test]
fn test_crc16_detects_corruption() {
    let mut block = vec![0x11u8; 14];
    let checksum = !crc::crc16(&block);
    block.extend_from_slice(&checksum.to_le_bytes());

    block[3] ^= 0x01;
    assert_ne!(crc::crc16(&block), crc::CRC_OK_RESIDUAL);
}
