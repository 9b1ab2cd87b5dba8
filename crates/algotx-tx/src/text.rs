//! Text ⇄ byte conversion for note, lease, metadata-hash and argument fields.
//!
//! Each byte field is entered either as UTF-8 text or as Base64, selected by
//! a per-field toggle. Fixed 32-byte fields (lease, metadata hash) accept
//! Base64 of exactly 32 bytes, or text of at most 32 bytes which is
//! right-padded with zero bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("expected at most {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Decode a Base64 string (surrounding whitespace ignored).
pub fn decode_base64(text: &str) -> Result<Vec<u8>, TextError> {
    Ok(STANDARD.decode(text.trim())?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Convert a field's textual form to raw bytes.
pub fn text_to_bytes(text: &str, base64: bool) -> Result<Vec<u8>, TextError> {
    if base64 {
        decode_base64(text)
    } else {
        Ok(text.as_bytes().to_vec())
    }
}

/// Render raw bytes for a field.
///
/// Returns the rendered string and whether it is Base64. Bytes that are not
/// valid UTF-8 are always rendered as Base64.
pub fn bytes_to_text(bytes: &[u8], prefer_base64: bool) -> (String, bool) {
    if !prefer_base64 {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return (s.to_string(), false);
        }
    }
    (encode_base64(bytes), true)
}

/// Resolve a fixed 32-byte field. Empty input means the field is absent.
pub fn resolve_fixed_32(text: &str, base64: bool) -> Result<Option<[u8; 32]>, TextError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let mut out = [0u8; 32];
    if base64 {
        let bytes = decode_base64(text)?;
        if bytes.len() != 32 {
            return Err(TextError::Length {
                expected: 32,
                actual: bytes.len(),
            });
        }
        out.copy_from_slice(&bytes);
    } else {
        let bytes = text.as_bytes();
        if bytes.len() > 32 {
            return Err(TextError::TooLong {
                max: 32,
                actual: bytes.len(),
            });
        }
        out[..bytes.len()].copy_from_slice(bytes);
    }
    Ok(Some(out))
}

/// Render a fixed 32-byte field. Trailing zero padding is stripped from the
/// text form.
pub fn render_fixed_32(bytes: &[u8; 32], prefer_base64: bool) -> (String, bool) {
    if !prefer_base64 {
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        if let Ok(s) = std::str::from_utf8(&bytes[..end]) {
            return (s.to_string(), false);
        }
    }
    (encode_base64(bytes), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_base64_bytes() {
        assert_eq!(text_to_bytes("hi", false).unwrap(), b"hi");
        assert_eq!(text_to_bytes("aGk=", true).unwrap(), b"hi");
        assert_eq!(text_to_bytes(" aGk= ", true).unwrap(), b"hi");
        assert!(matches!(
            text_to_bytes("%%%", true),
            Err(TextError::Base64(_))
        ));
    }

    #[test]
    fn test_fixed_32_exact_text() {
        let lease = "0123456789abcdef0123456789abcdef";
        let out = resolve_fixed_32(lease, false).unwrap().unwrap();
        assert_eq!(&out, lease.as_bytes());
    }

    #[test]
    fn test_fixed_32_short_text_padded() {
        let out = resolve_fixed_32("abc", false).unwrap().unwrap();
        assert_eq!(&out[..3], b"abc");
        assert!(out[3..].iter().all(|b| *b == 0));
        assert_eq!(render_fixed_32(&out, false), ("abc".to_string(), false));
    }

    #[test]
    fn test_fixed_32_rejects_long_and_wrong_base64() {
        let long = "x".repeat(33);
        assert_eq!(
            resolve_fixed_32(&long, false),
            Err(TextError::TooLong { max: 32, actual: 33 })
        );
        assert_eq!(
            resolve_fixed_32(&encode_base64(&[1u8; 31]), true),
            Err(TextError::Length {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_fixed_32_empty_is_absent() {
        assert_eq!(resolve_fixed_32("", false), Ok(None));
        assert_eq!(resolve_fixed_32("  ", true), Ok(None));
    }

    #[test]
    fn test_invalid_utf8_rendered_as_base64() {
        let bytes = [0xff, 0xfe, 0x00];
        let (s, is_b64) = bytes_to_text(&bytes, false);
        assert!(is_b64);
        assert_eq!(decode_base64(&s).unwrap(), bytes);

        let mut fixed = [0u8; 32];
        fixed[0] = 0xc3;
        assert!(render_fixed_32(&fixed, false).1);
    }
}
