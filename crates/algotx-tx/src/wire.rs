//! Canonical transaction encoding.
//!
//! Transactions are MessagePack maps with short keys, emitted in sorted key
//! order, with every zero/empty value omitted and byte strings as `bin`.
//! Struct fields below are declared in key order so that `to_vec_named`
//! produces the canonical byte layout directly.

use algotx_types::address::sha512_256;
use algotx_types::{base32, Address};
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;
use std::fmt;
use thiserror::Error;

/// Domain separation prefix for transaction signing and ids.
pub const TX_ID_PREFIX: &[u8] = b"TX";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("msgpack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

// ─── Fixed-size byte fields ─────────────────────────────────────────────────

/// Fixed-length byte string serialized as msgpack `bin`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> ByteArray<N> {
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// `None` for the all-zero value.
    pub fn non_zero(&self) -> Option<&[u8; N]> {
        if self.is_zero() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl<const N: usize> Default for ByteArray<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for ByteArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl<const N: usize> From<[u8; N]> for ByteArray<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> Serialize for ByteArray<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct ByteArrayVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for ByteArrayVisitor<N> {
    type Value = ByteArray<N>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{N} bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        let bytes: [u8; N] = v
            .try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))?;
        Ok(ByteArray(bytes))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = [0u8; N];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(ByteArray(bytes))
    }
}

impl<'de, const N: usize> Deserialize<'de> for ByteArray<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(ByteArrayVisitor::<N>)
    }
}

// ─── Nested records ─────────────────────────────────────────────────────────

/// Asset parameters (`apar`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetParams {
    #[serde(rename = "am", default, skip_serializing_if = "ByteArray::is_zero")]
    pub metadata_hash: ByteArray<32>,
    #[serde(rename = "an", default, skip_serializing_if = "String::is_empty")]
    pub asset_name: String,
    #[serde(rename = "au", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub clawback: Option<Address>,
    #[serde(rename = "dc", default, skip_serializing_if = "is_zero")]
    pub decimals: u64,
    #[serde(rename = "df", default, skip_serializing_if = "is_false")]
    pub default_frozen: bool,
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub freeze: Option<Address>,
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<Address>,
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub reserve: Option<Address>,
    #[serde(rename = "t", default, skip_serializing_if = "is_zero")]
    pub total: u64,
    #[serde(rename = "un", default, skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
}

impl AssetParams {
    pub fn is_empty(&self) -> bool {
        *self == AssetParams::default()
    }
}

/// Application state schema (`apgs` / `apls`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSchema {
    #[serde(rename = "nbs", default, skip_serializing_if = "is_zero")]
    pub num_byte_slices: u64,
    #[serde(rename = "nui", default, skip_serializing_if = "is_zero")]
    pub num_uints: u64,
}

impl StateSchema {
    pub fn is_empty(&self) -> bool {
        self.num_byte_slices == 0 && self.num_uints == 0
    }
}

/// Box reference (`apbx`). `index` 0 is the called application, otherwise a
/// 1-based index into the foreign apps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxRef {
    #[serde(rename = "i", default, skip_serializing_if = "is_zero")]
    pub index: u64,
    #[serde(
        rename = "n",
        with = "serde_bytes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub name: Vec<u8>,
}

// ─── Transaction ────────────────────────────────────────────────────────────

/// An unsigned transaction in canonical field layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    #[serde(rename = "aamt", default, skip_serializing_if = "is_zero")]
    pub asset_amount: u64,
    #[serde(rename = "aclose", default, skip_serializing_if = "Option::is_none")]
    pub asset_close_to: Option<Address>,
    #[serde(rename = "afrz", default, skip_serializing_if = "is_false")]
    pub asset_frozen: bool,
    #[serde(rename = "amt", default, skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", default, skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<ByteBuf>,
    #[serde(rename = "apan", default, skip_serializing_if = "is_zero")]
    pub on_completion: u64,
    #[serde(
        rename = "apap",
        with = "serde_bytes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub approval_program: Vec<u8>,
    #[serde(rename = "apar", default, skip_serializing_if = "Option::is_none")]
    pub asset_params: Option<AssetParams>,
    #[serde(rename = "apas", default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<u64>,
    #[serde(rename = "apat", default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Address>,
    #[serde(rename = "apbx", default, skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxRef>,
    #[serde(rename = "apep", default, skip_serializing_if = "is_zero")]
    pub extra_pages: u64,
    #[serde(rename = "apfa", default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_apps: Vec<u64>,
    #[serde(rename = "apgs", default, skip_serializing_if = "Option::is_none")]
    pub global_schema: Option<StateSchema>,
    #[serde(rename = "apid", default, skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(rename = "apls", default, skip_serializing_if = "Option::is_none")]
    pub local_schema: Option<StateSchema>,
    #[serde(
        rename = "apsu",
        with = "serde_bytes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub clear_program: Vec<u8>,
    #[serde(rename = "arcv", default, skip_serializing_if = "Option::is_none")]
    pub asset_receiver: Option<Address>,
    #[serde(rename = "asnd", default, skip_serializing_if = "Option::is_none")]
    pub asset_sender: Option<Address>,
    #[serde(rename = "caid", default, skip_serializing_if = "is_zero")]
    pub config_asset: u64,
    #[serde(rename = "close", default, skip_serializing_if = "Option::is_none")]
    pub close_remainder_to: Option<Address>,
    #[serde(rename = "fadd", default, skip_serializing_if = "Option::is_none")]
    pub freeze_account: Option<Address>,
    #[serde(rename = "faid", default, skip_serializing_if = "is_zero")]
    pub freeze_asset: u64,
    #[serde(rename = "fee", default, skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", default, skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", default, skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh", default, skip_serializing_if = "ByteArray::is_zero")]
    pub genesis_hash: ByteArray<32>,
    #[serde(rename = "grp", default, skip_serializing_if = "ByteArray::is_zero")]
    pub group: ByteArray<32>,
    #[serde(rename = "lv", default, skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(rename = "lx", default, skip_serializing_if = "ByteArray::is_zero")]
    pub lease: ByteArray<32>,
    #[serde(rename = "nonpart", default, skip_serializing_if = "is_false")]
    pub non_participation: bool,
    #[serde(
        rename = "note",
        with = "serde_bytes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub note: Vec<u8>,
    #[serde(rename = "rcv", default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde(rename = "rekey", default, skip_serializing_if = "Option::is_none")]
    pub rekey_to: Option<Address>,
    #[serde(rename = "selkey", default, skip_serializing_if = "ByteArray::is_zero")]
    pub selection_key: ByteArray<32>,
    #[serde(rename = "snd", default, skip_serializing_if = "Address::is_zero")]
    pub sender: Address,
    #[serde(rename = "sprfkey", default, skip_serializing_if = "ByteArray::is_zero")]
    pub state_proof_key: ByteArray<64>,
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(rename = "votefst", default, skip_serializing_if = "is_zero")]
    pub vote_first: u64,
    #[serde(rename = "votekd", default, skip_serializing_if = "is_zero")]
    pub vote_key_dilution: u64,
    #[serde(rename = "votekey", default, skip_serializing_if = "ByteArray::is_zero")]
    pub vote_key: ByteArray<32>,
    #[serde(rename = "votelst", default, skip_serializing_if = "is_zero")]
    pub vote_last: u64,
    #[serde(rename = "xaid", default, skip_serializing_if = "is_zero")]
    pub transfer_asset: u64,
}

impl Transaction {
    /// Canonical msgpack bytes.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, WireError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// The bytes a signer signs: `"TX"` followed by the canonical encoding.
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, WireError> {
        let body = self.to_msgpack()?;
        let mut out = Vec::with_capacity(TX_ID_PREFIX.len() + body.len());
        out.extend_from_slice(TX_ID_PREFIX);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Transaction id: unpadded base32 of SHA-512/256 over the signing bytes.
    pub fn id(&self) -> Result<String, WireError> {
        Ok(base32::encode(&sha512_256(&self.bytes_to_sign()?)))
    }
}

// ─── Signed envelope ────────────────────────────────────────────────────────

/// A signed transaction (`{sgnr?, sig, txn}`).
///
/// Multisig and logic-signature authorizations are recognized but not
/// modelled; they are only preserved through the original bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(default, skip_serializing)]
    pub lsig: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub msig: Option<IgnoredAny>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sgnr: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<ByteArray<64>>,
    pub txn: Transaction,
}

impl SignedTransaction {
    pub fn new(txn: Transaction, sig: [u8; 64], signer: Option<Address>) -> Self {
        Self {
            lsig: None,
            msig: None,
            sgnr: signer,
            sig: Some(ByteArray(sig)),
            txn,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, WireError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Whether any authorization (single, multi or logic signature) is present.
    pub fn is_signed(&self) -> bool {
        self.sig.is_some() || self.msig.is_some() || self.lsig.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Transaction {
        Transaction {
            tx_type: "pay".into(),
            sender: Address([1; 32]),
            receiver: Some(Address([2; 32])),
            amount: 5_000_000,
            fee: 1_000,
            first_valid: 100,
            last_valid: 1_100,
            genesis_id: "testnet-v1.0".into(),
            genesis_hash: ByteArray([9; 32]),
            ..Default::default()
        }
    }

    #[test]
    fn test_keys_sorted_and_zero_fields_omitted() {
        let bytes = payment().to_msgpack().unwrap();
        // fixmap with 9 entries: amt fee fv gen gh lv rcv snd type
        assert_eq!(bytes[0], 0x89);
        let keys: Vec<&[u8]> = vec![
            b"amt", b"fee", b"fv", b"gen", b"gh", b"lv", b"rcv", b"snd", b"type",
        ];
        let mut last = 0;
        for key in keys {
            let pos = bytes
                .windows(key.len())
                .position(|w| w == key)
                .unwrap_or_else(|| panic!("missing key {:?}", key));
            assert!(pos > last);
            last = pos;
        }
        assert!(!bytes.windows(4).any(|w| w == b"note"));
    }

    #[test]
    fn test_bytes_are_bin() {
        let bytes = payment().to_msgpack().unwrap();
        // "gh" key followed by bin8 marker and length 32
        let pos = bytes.windows(3).position(|w| w == b"\xa2gh").unwrap();
        assert_eq!(bytes[pos + 3], 0xc4);
        assert_eq!(bytes[pos + 4], 32);
    }

    #[test]
    fn test_transaction_roundtrip_and_id() {
        let tx = payment();
        let bytes = tx.to_msgpack().unwrap();
        let back = Transaction::from_msgpack(&bytes).unwrap();
        assert_eq!(back, tx);

        let id = tx.id().unwrap();
        assert_eq!(id.len(), 52);
        assert_eq!(id, back.id().unwrap());
        assert!(tx.bytes_to_sign().unwrap().starts_with(b"TX"));
    }

    #[test]
    fn test_unsigned_rejects_signed_envelope() {
        let signed = SignedTransaction::new(payment(), [7; 64], None);
        let bytes = signed.to_msgpack().unwrap();
        assert!(Transaction::from_msgpack(&bytes).is_err());

        let back = SignedTransaction::from_msgpack(&bytes).unwrap();
        assert!(back.is_signed());
        assert_eq!(back.txn, payment());
        assert_eq!(back.sig, Some(ByteArray([7; 64])));
    }

    #[test]
    fn test_signed_requires_txn() {
        let bytes = payment().to_msgpack().unwrap();
        assert!(SignedTransaction::from_msgpack(&bytes).is_err());
    }

    #[test]
    fn test_missing_type_is_error() {
        // {"fee": 1000}
        let bytes = [0x81, 0xa3, b'f', b'e', b'e', 0xcd, 0x03, 0xe8];
        assert!(Transaction::from_msgpack(&bytes).is_err());
    }

    #[test]
    fn test_asset_params_nested_order() {
        let tx = Transaction {
            tx_type: "acfg".into(),
            sender: Address([1; 32]),
            asset_params: Some(AssetParams {
                total: 1000,
                decimals: 2,
                unit_name: "TOK".into(),
                asset_name: "Token".into(),
                manager: Some(Address([1; 32])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let bytes = tx.to_msgpack().unwrap();
        let an = bytes.windows(3).position(|w| w == b"\xa2an").unwrap();
        let dc = bytes.windows(3).position(|w| w == b"\xa2dc").unwrap();
        let un = bytes.windows(3).position(|w| w == b"\xa2un").unwrap();
        assert!(an < dc && dc < un);
        assert_eq!(Transaction::from_msgpack(&bytes).unwrap(), tx);
    }
}
