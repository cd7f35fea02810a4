//! Single entry point for balance reads and mutations.

use std::sync::Arc;

use serde::Serialize;

use crate::config::VaultConfig;
use crate::error::VaultResult;
use crate::ledger::LedgerRpc;
use crate::mock::{BalanceStorage, MockLedgerStore, MockMutation};
use crate::transaction::{TransactionEngine, TransactionOutcome};
use crate::wallet::WalletExtension;

/// Result of a deposit or withdraw as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationReceipt {
    /// Balance after the mutation. In live mode this is re-read from the ledger.
    pub new_balance: f64,
    pub requested: f64,
    /// Amount actually applied after truncation (and, for a live withdraw,
    /// any feasibility reduction).
    pub applied: f64,
    pub tx_hash: Option<String>,
    /// Ledger account the mutation was applied to; `None` for the mock.
    pub account: Option<String>,
}

pub enum VaultBackend {
    Mock(MockLedgerStore),
    Live(TransactionEngine),
}

/// Routes each call to the mock store or the live transaction engine.
pub struct Vault {
    backend: VaultBackend,
    min_balance: f64,
}

impl Vault {
    pub fn new(backend: VaultBackend, min_balance: f64) -> Self {
        Self {
            backend,
            min_balance,
        }
    }

    pub fn mock(config: &VaultConfig, storage: Arc<dyn BalanceStorage>) -> VaultResult<Self> {
        let precision = config.asset.precision()?;
        let store = MockLedgerStore::new(storage, config.mock.storage_key.clone(), precision);
        tracing::info!(key = %config.mock.storage_key, "Vault using mock ledger");
        Ok(Self::new(VaultBackend::Mock(store), config.vault.min_balance))
    }

    pub fn live(
        config: &VaultConfig,
        ledger: Arc<dyn LedgerRpc>,
        wallet: Arc<dyn WalletExtension>,
    ) -> VaultResult<Self> {
        let engine = TransactionEngine::new(ledger, wallet, config)?;
        tracing::info!(
            contract_id = %config.ledger.contract_id,
            reserve_id = %config.ledger.reserve_id,
            "Vault using live ledger"
        );
        Ok(Self::new(VaultBackend::Live(engine), config.vault.min_balance))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.backend, VaultBackend::Mock(_))
    }

    /// Threshold at which gated features unlock.
    pub fn minimum_required_balance(&self) -> f64 {
        self.min_balance
    }

    pub fn is_unlocked(&self, balance: f64) -> bool {
        balance >= self.min_balance
    }

    /// Account a call with `user` would act on. The single-account mock has
    /// none; live mode falls back to the wallet's active address.
    pub async fn account(&self, user: Option<&str>) -> VaultResult<Option<String>> {
        match &self.backend {
            VaultBackend::Mock(_) => Ok(None),
            VaultBackend::Live(engine) => engine.source_account(user).await.map(Some),
        }
    }

    /// Current balance. `user` selects the account in live mode and is ignored
    /// by the single-account mock.
    pub async fn get_balance(&self, user: Option<&str>) -> VaultResult<f64> {
        match &self.backend {
            VaultBackend::Mock(store) => Ok(store.read()),
            VaultBackend::Live(engine) => Ok(engine.fetch_balance(user).await?.to_human()),
        }
    }

    pub async fn deposit(&self, amount: f64, user: Option<&str>) -> VaultResult<MutationReceipt> {
        match &self.backend {
            VaultBackend::Mock(store) => {
                let done = store.deposit(amount)?;
                Ok(mock_receipt(amount, done))
            }
            VaultBackend::Live(engine) => {
                let outcome = engine.deposit(amount, user).await?;
                self.live_receipt(engine, amount, outcome).await
            }
        }
    }

    pub async fn withdraw(&self, amount: f64, user: Option<&str>) -> VaultResult<MutationReceipt> {
        match &self.backend {
            VaultBackend::Mock(store) => {
                let done = store.withdraw(amount)?;
                Ok(mock_receipt(amount, done))
            }
            VaultBackend::Live(engine) => {
                let outcome = engine.withdraw(amount, user).await?;
                self.live_receipt(engine, amount, outcome).await
            }
        }
    }

    /// Re-read the authoritative balance after a confirmed mutation.
    async fn live_receipt(
        &self,
        engine: &TransactionEngine,
        requested: f64,
        outcome: TransactionOutcome,
    ) -> VaultResult<MutationReceipt> {
        let new_balance = engine
            .fetch_balance(Some(&outcome.source))
            .await
            .map_err(|e| {
                tracing::warn!(
                    tx_hash = %outcome.tx_hash,
                    error = %e,
                    "Transaction confirmed but balance re-read failed"
                );
                e
            })?;

        Ok(MutationReceipt {
            new_balance: new_balance.to_human(),
            requested,
            applied: outcome.applied.to_human(),
            tx_hash: Some(outcome.tx_hash),
            account: Some(outcome.source),
        })
    }
}

fn mock_receipt(requested: f64, done: MockMutation) -> MutationReceipt {
    MutationReceipt {
        new_balance: done.balance.to_human(),
        requested,
        applied: done.applied.to_human(),
        tx_hash: None,
        account: None,
    }
}
