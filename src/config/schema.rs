//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the vault layer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::amount::{AmountError, Precision, DEFAULT_DECIMALS};
use crate::wallet::NetworkIdentity;

/// Root configuration, constructed once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VaultConfig {
    /// Ledger RPC endpoint and contract identifiers.
    pub ledger: LedgerConfig,

    /// Asset precision.
    pub asset: AssetConfig,

    /// Routing and gate settings.
    pub vault: VaultSettings,

    /// Local fallback store.
    pub mock: MockConfig,

    /// Network the wallet is expected to be on.
    pub network: NetworkConfig,

    /// Wallet bridge and watcher settings.
    pub wallet: WalletConfig,

    /// Confirmation polling and withdraw search.
    pub transactions: TransactionConfig,

    /// Balance cache staleness.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL. Must be https outside mock mode.
    pub rpc_url: String,

    /// Vault contract identifier.
    pub contract_id: String,

    /// Reserve (asset pool) the balance is denominated against.
    pub reserve_id: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Base inclusion fee in smallest fee units, before resource fees.
    pub base_fee: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://soroban-testnet.stellar.org".to_string(),
            contract_id: String::new(),
            reserve_id: String::new(),
            rpc_timeout_secs: 10,
            base_fee: 100,
        }
    }
}

impl LedgerConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Digits after the decimal point of the vault asset.
    pub decimals: u8,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { decimals: DEFAULT_DECIMALS }
    }
}

impl AssetConfig {
    pub fn precision(&self) -> Result<Precision, AmountError> {
        Precision::new(self.decimals)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Serve every call from the local mock store.
    pub mock_mode: bool,

    /// Balance required to unlock gated features.
    pub min_balance: f64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            mock_mode: true,
            min_balance: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MockConfig {
    /// JSON file holding the persisted mock state.
    pub state_path: String,

    /// Namespaced key the balance is stored under.
    pub storage_key: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            state_path: "vault_state.json".to_string(),
            storage_key: crate::mock::STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub expected_name: String,
    pub expected_passphrase: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            expected_name: "TESTNET".to_string(),
            expected_passphrase: "Test SDF Network ; September 2015".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn expected(&self) -> NetworkIdentity {
        NetworkIdentity {
            name: self.expected_name.clone(),
            passphrase: self.expected_passphrase.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Local wallet bridge endpoint.
    pub bridge_url: String,

    /// Account/network change polling interval in milliseconds.
    pub watch_interval_ms: u64,

    /// Timeout for non-prompting wallet calls in seconds.
    pub request_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://127.0.0.1:4780".to_string(),
            watch_interval_ms: 1000,
            request_timeout_secs: 5,
        }
    }
}

impl WalletConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Status polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up waiting for confirmation after this many seconds.
    pub confirmation_timeout_secs: u64,

    /// Smallest-unit decrements tried after a failed withdraw simulation.
    pub withdraw_max_decrements: u32,

    /// Validity window attached to built transactions, in seconds.
    pub tx_timeout_secs: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            confirmation_timeout_secs: 60,
            withdraw_max_decrements: 5,
            tx_timeout_secs: 300,
        }
    }
}

impl TransactionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cached balances older than this are refreshed on next access.
    pub stale_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { stale_after_secs: 10 }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
