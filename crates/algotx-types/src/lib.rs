//! Core types and constants for algotx.
//!
//! This crate provides the foundational types used across all algotx crates:
//! account address encoding/decoding, the decimal/base-unit amount codec,
//! protocol limits, and per-network defaults.

pub mod address;
pub mod base32;
pub mod constants;
pub mod units;

pub use address::{is_valid_address, parse_address, Address, AddressError};
pub use constants::{Network, NetworkConfig};
pub use units::{base_units_to_decimal, decimal_to_base_units, AmountError};
