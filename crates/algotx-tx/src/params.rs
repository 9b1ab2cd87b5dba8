//! Network parameters consumed by the encoder and decoder.

use algotx_types::constants::{DEFAULT_VALIDITY_WINDOW, MIN_TXN_FEE};
use serde::{Deserialize, Serialize};

/// Suggested parameters for the selected network.
///
/// Read-only input: fetched from the node, never edited by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    /// Suggested fee per byte of signed transaction.
    pub fee_per_byte: u64,
    pub min_fee: u64,
    /// Suggested validity window.
    pub first_round: u64,
    pub last_round: u64,
}

impl NetworkParams {
    /// Parameters with the default validity window starting at `round`.
    pub fn at_round(genesis_id: &str, genesis_hash: [u8; 32], round: u64) -> Self {
        Self {
            genesis_id: genesis_id.to_string(),
            genesis_hash,
            fee_per_byte: 0,
            min_fee: MIN_TXN_FEE,
            first_round: round,
            last_round: round.saturating_add(DEFAULT_VALIDITY_WINDOW),
        }
    }

    /// Suggested fee for a signed transaction of `size` bytes.
    pub fn suggested_fee(&self, size: usize) -> u64 {
        self.fee_per_byte
            .saturating_mul(size as u64)
            .max(self.min_fee)
    }

    pub fn genesis_hash_base64(&self) -> String {
        crate::text::encode_base64(&self.genesis_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_fee_floor() {
        let params = NetworkParams::at_round("testnet-v1.0", [1; 32], 100);
        assert_eq!(params.suggested_fee(250), MIN_TXN_FEE);
        assert_eq!(params.last_round, 1100);

        let busy = NetworkParams {
            fee_per_byte: 10,
            ..params
        };
        assert_eq!(busy.suggested_fee(250), 2500);
    }

    #[test]
    fn test_window_saturates_at_last_round() {
        let params = NetworkParams::at_round("testnet-v1.0", [1; 32], u64::MAX - 1);
        assert_eq!(params.last_round, u64::MAX);
    }
}
