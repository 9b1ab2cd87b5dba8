//! Account address parsing, validation, and creation.
//!
//! An address is the 32-byte ed25519 public key followed by a 4-byte
//! checksum (the last four bytes of SHA-512/256 of the key), rendered as
//! 58 characters of unpadded Base32.

use crate::base32;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Public key size in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Checksum size in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// Length of the textual address form.
pub const ADDRESS_LENGTH: usize = 58;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be a non-empty string")]
    Empty,

    #[error("invalid address length ({0}), expected {ADDRESS_LENGTH}")]
    InvalidLength(usize),

    #[error("base32 decode error: {0}")]
    Base32(#[from] base32::Base32Error),

    #[error("invalid data length: expected {expected} bytes, got {actual}")]
    InvalidDataLength { expected: usize, actual: usize },

    #[error("checksum mismatch")]
    ChecksumMismatch,
}

/// SHA-512/256 digest, the hash used for address checksums and transaction ids.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha512_256::digest(data));
    out
}

fn checksum(public_key: &[u8; PUBLIC_KEY_SIZE]) -> [u8; CHECKSUM_SIZE] {
    let hash = sha512_256(public_key);
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&hash[32 - CHECKSUM_SIZE..]);
    out
}

/// A ledger account address.
///
/// Serializes as its raw 32 public-key bytes, which is the form used inside
/// the canonical transaction encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; PUBLIC_KEY_SIZE]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; PUBLIC_KEY_SIZE]);

    pub fn from_public_key(public_key: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(public_key)
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBLIC_KEY_SIZE]
    }

    /// Encode to the 58-character checksummed string.
    pub fn encode(&self) -> String {
        let mut data = Vec::with_capacity(PUBLIC_KEY_SIZE + CHECKSUM_SIZE);
        data.extend_from_slice(&self.0);
        data.extend_from_slice(&checksum(&self.0));
        base32::encode(&data)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s)
    }
}

/// Parse and validate an address string.
pub fn parse_address(address: &str) -> Result<Address, AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if address.len() != ADDRESS_LENGTH {
        return Err(AddressError::InvalidLength(address.len()));
    }

    let decoded = base32::decode(address)?;
    if decoded.len() != PUBLIC_KEY_SIZE + CHECKSUM_SIZE {
        return Err(AddressError::InvalidDataLength {
            expected: PUBLIC_KEY_SIZE + CHECKSUM_SIZE,
            actual: decoded.len(),
        });
    }

    let mut public_key = [0u8; PUBLIC_KEY_SIZE];
    public_key.copy_from_slice(&decoded[..PUBLIC_KEY_SIZE]);

    if decoded[PUBLIC_KEY_SIZE..] != checksum(&public_key) {
        return Err(AddressError::ChecksumMismatch);
    }

    Ok(Address(public_key))
}

/// Validate an address string.
pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PUBLIC_KEY_SIZE} address bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Address, E> {
        let key: [u8; PUBLIC_KEY_SIZE] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(Address(key))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Address, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Address, A::Error> {
        let mut key = [0u8; PUBLIC_KEY_SIZE];
        for (i, slot) in key.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(PUBLIC_KEY_SIZE + 1, &self));
        }
        Ok(Address(key))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(AddressVisitor)
    }
}
