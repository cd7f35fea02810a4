//! Startup orchestration.
//!
//! # Responsibilities
//! - Build concrete collaborators from a validated configuration
//! - Wire the vault, its cache and the wallet session together
//!
//! # Design Decisions
//! - Fail fast: any construction error is fatal
//! - The ledger client is only built in live mode

use std::sync::Arc;

use crate::config::VaultConfig;
use crate::error::VaultResult;
use crate::ledger::JsonRpcLedgerClient;
use crate::mock::FileStorage;
use crate::vault::{BalanceCache, Vault};
use crate::wallet::{HttpWalletBridge, SessionMonitor, WalletExtension};

/// Everything a long-running process or a one-shot command needs.
pub struct VaultRuntime {
    pub config: VaultConfig,
    pub wallet: Arc<dyn WalletExtension>,
    pub session: Arc<SessionMonitor>,
    pub vault: Arc<Vault>,
    pub cache: Arc<BalanceCache>,
}

pub fn build_runtime(config: VaultConfig) -> VaultResult<VaultRuntime> {
    let wallet: Arc<dyn WalletExtension> = Arc::new(HttpWalletBridge::from_config(&config.wallet)?);
    build_runtime_with_wallet(config, wallet)
}

/// Same as [`build_runtime`] with a caller-supplied wallet extension.
pub fn build_runtime_with_wallet(
    config: VaultConfig,
    wallet: Arc<dyn WalletExtension>,
) -> VaultResult<VaultRuntime> {
    let vault = Arc::new(build_vault(&config, wallet.clone())?);
    let cache = Arc::new(BalanceCache::new(vault.clone(), config.cache.stale_after()));
    let session = Arc::new(SessionMonitor::new(wallet.clone(), config.network.expected()));

    tracing::info!(
        mock_mode = config.vault.mock_mode,
        min_balance = config.vault.min_balance,
        "Vault runtime initialized"
    );

    Ok(VaultRuntime {
        config,
        wallet,
        session,
        vault,
        cache,
    })
}

pub fn build_vault(config: &VaultConfig, wallet: Arc<dyn WalletExtension>) -> VaultResult<Vault> {
    if config.vault.mock_mode {
        let storage = Arc::new(FileStorage::new(&config.mock.state_path));
        Vault::mock(config, storage)
    } else {
        let ledger = Arc::new(JsonRpcLedgerClient::new(&config.ledger)?);
        Vault::live(config, ledger, wallet)
    }
}
