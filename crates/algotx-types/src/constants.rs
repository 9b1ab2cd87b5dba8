//! Network defaults, protocol limits, and amount constants.

use serde::{Deserialize, Serialize};

// =============================================================================
// Network Types
// =============================================================================

/// Network type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Betanet,
    Localnet,
}

/// Static per-network configuration.
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub network: Network,
    pub genesis_id: &'static str,
    pub default_node_url: &'static str,
    /// API token expected by the default node (empty for public endpoints).
    pub default_token: &'static str,
}

pub static MAINNET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Mainnet,
    genesis_id: "mainnet-v1.0",
    default_node_url: "https://mainnet-api.algonode.cloud",
    default_token: "",
};

pub static TESTNET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Testnet,
    genesis_id: "testnet-v1.0",
    default_node_url: "https://testnet-api.algonode.cloud",
    default_token: "",
};

pub static BETANET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Betanet,
    genesis_id: "betanet-v1.0",
    default_node_url: "https://betanet-api.algonode.cloud",
    default_token: "",
};

pub static LOCALNET_CONFIG: NetworkConfig = NetworkConfig {
    network: Network::Localnet,
    genesis_id: "dockernet-v1",
    default_node_url: "http://localhost:4001",
    default_token: "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
};

/// Get the network configuration for a given network.
pub fn network_config(network: Network) -> &'static NetworkConfig {
    match network {
        Network::Mainnet => &MAINNET_CONFIG,
        Network::Testnet => &TESTNET_CONFIG,
        Network::Betanet => &BETANET_CONFIG,
        Network::Localnet => &LOCALNET_CONFIG,
    }
}

// =============================================================================
// Amount Helpers
// =============================================================================

/// Decimal places of the native ledger currency.
pub const NATIVE_DECIMALS: u32 = 6;

/// Base units per whole native coin (10^6).
pub const BASE_UNITS_PER_COIN: u64 = 1_000_000;

/// Minimum transaction fee in base units.
pub const MIN_TXN_FEE: u64 = 1_000;

// =============================================================================
// Validity / Confirmation
// =============================================================================

/// Rounds added to the current round for a suggested validity window.
pub const DEFAULT_VALIDITY_WINDOW: u64 = 1_000;

/// Rounds to wait for confirmation before reporting a timeout warning.
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 10;

/// Bytes added to an unsigned transaction to estimate its signed size.
pub const SIGNATURE_OVERHEAD: usize = 75;

// =============================================================================
// Protocol Limits
// =============================================================================

pub mod limits {
    /// Maximum note size in bytes.
    pub const MAX_NOTE_BYTES: usize = 1024;
    /// Lease and metadata-hash size in bytes.
    pub const LEASE_BYTES: usize = 32;
    pub const METADATA_HASH_BYTES: usize = 32;
    pub const MAX_UNIT_NAME_BYTES: usize = 8;
    pub const MAX_ASSET_NAME_BYTES: usize = 32;
    pub const MAX_ASSET_URL_BYTES: usize = 96;
    pub const MAX_ASSET_DECIMALS: u32 = 19;

    pub const MAX_APP_ARGS: usize = 16;
    pub const MAX_APP_TOTAL_ARG_BYTES: usize = 2048;
    pub const MAX_FOREIGN_ACCOUNTS: usize = 4;
    pub const MAX_FOREIGN_APPS: usize = 8;
    pub const MAX_FOREIGN_ASSETS: usize = 8;
    pub const MAX_BOX_REFERENCES: usize = 8;
    /// Accounts + apps + assets + box references.
    pub const MAX_TOTAL_DEPENDENCIES: usize = 8;
    pub const MAX_GLOBAL_SCHEMA_ENTRIES: u64 = 64;
    pub const MAX_LOCAL_SCHEMA_ENTRIES: u64 = 16;
    pub const MAX_EXTRA_PROGRAM_PAGES: u64 = 3;
    pub const PROGRAM_PAGE_BYTES: usize = 2048;
    pub const MAX_BOX_NAME_BYTES: usize = 64;

    pub const VOTE_KEY_BYTES: usize = 32;
    pub const SELECTION_KEY_BYTES: usize = 32;
    pub const STATE_PROOF_KEY_BYTES: usize = 64;

    /// Length of the Base64 text for `n` raw bytes (with padding).
    pub const fn base64_len(n: usize) -> usize {
        n.div_ceil(3) * 4
    }

    /// Note ceiling when entered as Base64.
    pub const MAX_NOTE_BASE64_CHARS: usize = base64_len(MAX_NOTE_BYTES);
    /// Lease ceiling when entered as Base64.
    pub const LEASE_BASE64_CHARS: usize = base64_len(LEASE_BYTES);
}
