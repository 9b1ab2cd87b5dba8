//! RFC 4648 Base32 encoding/decoding without padding.
//!
//! Addresses and transaction ids are rendered in this alphabet. Decoding is
//! strict: padding characters, lowercase input and non-zero trailing bits are
//! rejected so that every byte string has exactly one textual form.

use thiserror::Error;

/// Base32 alphabet (RFC 4648, uppercase).
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Base32Error {
    #[error("invalid character '{0}' at position {1}")]
    InvalidCharacter(char, usize),

    #[error("invalid encoded length {0}")]
    InvalidLength(usize),

    #[error("non-zero trailing bits")]
    NonZeroPadding,
}

/// Build reverse alphabet lookup table at compile time.
const fn build_reverse_alphabet() -> [u8; 128] {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static REVERSE_ALPHABET: [u8; 128] = build_reverse_alphabet();

fn decode_char(c: char) -> Option<u8> {
    let idx = c as usize;
    if idx >= 128 {
        return None;
    }
    match REVERSE_ALPHABET[idx] {
        0xFF => None,
        v => Some(v),
    }
}

/// Encode binary data to unpadded Base32.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }

    out
}

/// Decode unpadded Base32 to binary data.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Base32Error> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for (i, c) in encoded.chars().enumerate() {
        let value = decode_char(c).ok_or(Base32Error::InvalidCharacter(c, i))?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    // A full leftover character carries no data.
    if bits >= 5 {
        return Err(Base32Error::InvalidLength(encoded.len()));
    }
    if buffer != 0 {
        return Err(Base32Error::NonZeroPadding);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4648_vectors() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "MY");
        assert_eq!(encode(b"fo"), "MZXQ");
        assert_eq!(encode(b"foo"), "MZXW6");
        assert_eq!(encode(b"foob"), "MZXW6YQ");
        assert_eq!(encode(b"fooba"), "MZXW6YTB");
        assert_eq!(encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_decode_vectors() {
        assert_eq!(decode("MZXW6YTBOI").unwrap(), b"foobar");
        assert_eq!(decode("MY").unwrap(), b"f");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_36_bytes() {
        let data: Vec<u8> = (0..36).collect();
        let encoded = encode(&data);
        assert_eq!(encoded.len(), 58);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_rejects_lowercase_and_padding() {
        assert_eq!(
            decode("mzxw6"),
            Err(Base32Error::InvalidCharacter('m', 0))
        );
        assert!(matches!(
            decode("MY======"),
            Err(Base32Error::InvalidCharacter('=', 2))
        ));
    }

    #[test]
    fn test_rejects_dangling_character() {
        assert_eq!(decode("M"), Err(Base32Error::InvalidLength(1)));
    }

    #[test]
    fn test_rejects_non_zero_trailing_bits() {
        // "MZ" leaves a non-zero low bit after the single decoded byte.
        assert_eq!(decode("MZ"), Err(Base32Error::NonZeroPadding));
    }
}
