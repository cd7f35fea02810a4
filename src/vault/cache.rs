//! Per-account last-known balance cache.
//!
//! # Design Decisions
//! - Stale entries are served immediately while one background refresh runs
//! - A failed fetch or mutation never clears or rolls back an entry
//! - No map guard is held across an await
//! - In live mode a call without an account is keyed by the wallet's active
//!   address, resolved per call, so switching accounts never serves another
//!   account's entry. `Anonymous` only exists for the mock.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::VaultResult;
use crate::observability::metrics;
use crate::vault::facade::{MutationReceipt, Vault};

/// Cache key. The single-account mock uses `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccountKey {
    Anonymous,
    Address(String),
}

impl AccountKey {
    pub fn from_user(user: Option<&str>) -> Self {
        match user {
            Some(address) if !address.is_empty() => AccountKey::Address(address.to_string()),
            _ => AccountKey::Anonymous,
        }
    }

    pub fn as_user(&self) -> Option<&str> {
        match self {
            AccountKey::Anonymous => None,
            AccountKey::Address(address) => Some(address),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKey::Anonymous => f.write_str("anon"),
            AccountKey::Address(address) => f.write_str(address),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedBalance {
    value: f64,
    fetched_at: Instant,
}

pub struct BalanceCache {
    vault: Arc<Vault>,
    stale_after: Duration,
    entries: DashMap<AccountKey, CachedBalance>,
    refreshing: DashMap<AccountKey, ()>,
}

impl BalanceCache {
    pub fn new(vault: Arc<Vault>, stale_after: Duration) -> Self {
        Self {
            vault,
            stale_after,
            entries: DashMap::new(),
            refreshing: DashMap::new(),
        }
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    /// Key for `user`: the explicit account, the wallet's active address in
    /// live mode, or `Anonymous` for the mock.
    pub async fn key_for(&self, user: Option<&str>) -> VaultResult<AccountKey> {
        let account = self.vault.account(user).await?;
        Ok(AccountKey::from_user(account.as_deref()))
    }

    /// Last known balance, if any, without touching the vault or the wallet.
    /// Live-mode entries are keyed by address, so pass it explicitly.
    pub fn last_known(&self, user: Option<&str>) -> Option<f64> {
        self.entries
            .get(&self.local_key(user))
            .map(|entry| entry.value)
    }

    /// Cached balance. A fresh entry is returned as is; a stale one is returned
    /// while a refresh runs in the background; a miss waits for the vault.
    pub async fn balance(self: &Arc<Self>, user: Option<&str>) -> VaultResult<f64> {
        let key = self.key_for(user).await?;
        let cached = self.entries.get(&key).map(|entry| *entry);

        match cached {
            Some(entry) if entry.fetched_at.elapsed() < self.stale_after => {
                metrics::record_cache_lookup("hit");
                Ok(entry.value)
            }
            Some(entry) => {
                metrics::record_cache_lookup("stale");
                self.spawn_refresh(key);
                Ok(entry.value)
            }
            None => {
                metrics::record_cache_lookup("miss");
                self.refresh_key(key).await
            }
        }
    }

    /// Fetch from the vault and store. On failure the previous entry stays.
    pub async fn refresh(&self, user: Option<&str>) -> VaultResult<f64> {
        let key = self.key_for(user).await?;
        self.refresh_key(key).await
    }

    async fn refresh_key(&self, key: AccountKey) -> VaultResult<f64> {
        match self.vault.get_balance(key.as_user()).await {
            Ok(value) => {
                self.store(key, value);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(account = %key, error = %e, "Balance refresh failed, keeping last known value");
                Err(e)
            }
        }
    }

    pub fn invalidate(&self, user: Option<&str>) {
        self.entries.remove(&self.local_key(user));
        metrics::record_cache_size(self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deposit through the vault; on success the entry of the account the
    /// receipt names is replaced.
    pub async fn deposit(&self, amount: f64, user: Option<&str>) -> VaultResult<MutationReceipt> {
        let receipt = self.vault.deposit(amount, user).await?;
        self.store_receipt(&receipt);
        Ok(receipt)
    }

    /// Withdraw through the vault; on success the entry of the account the
    /// receipt names is replaced.
    pub async fn withdraw(&self, amount: f64, user: Option<&str>) -> VaultResult<MutationReceipt> {
        let receipt = self.vault.withdraw(amount, user).await?;
        self.store_receipt(&receipt);
        Ok(receipt)
    }

    /// Key without asking the wallet: `Anonymous` for the mock, else the
    /// account as given.
    fn local_key(&self, user: Option<&str>) -> AccountKey {
        if self.vault.is_mock() {
            AccountKey::Anonymous
        } else {
            AccountKey::from_user(user)
        }
    }

    fn store_receipt(&self, receipt: &MutationReceipt) {
        self.store(
            AccountKey::from_user(receipt.account.as_deref()),
            receipt.new_balance,
        );
    }

    fn store(&self, key: AccountKey, value: f64) {
        self.entries.insert(
            key,
            CachedBalance {
                value,
                fetched_at: Instant::now(),
            },
        );
        metrics::record_cache_size(self.entries.len());
    }

    fn spawn_refresh(self: &Arc<Self>, key: AccountKey) {
        if self.refreshing.insert(key.clone(), ()).is_some() {
            return;
        }
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let _ = cache.refresh_key(key.clone()).await;
            cache.refreshing.remove(&key);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::mock::{BalanceStorage, MemoryStorage, STORAGE_KEY};
    use crate::test_helpers::{live_config, StubLedger, StubWallet};

    fn mock_cache(stale_after: Duration) -> (Arc<BalanceCache>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::with_value(STORAGE_KEY, "3"));
        let vault = Vault::mock(&VaultConfig::default(), storage.clone()).unwrap();
        (Arc::new(BalanceCache::new(Arc::new(vault), stale_after)), storage)
    }

    #[test]
    fn test_account_key() {
        assert_eq!(AccountKey::from_user(None), AccountKey::Anonymous);
        assert_eq!(AccountKey::from_user(Some("")), AccountKey::Anonymous);
        assert_eq!(AccountKey::from_user(Some("GABC")).to_string(), "GABC");
        assert_eq!(AccountKey::Anonymous.to_string(), "anon");
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, storage) = mock_cache(Duration::from_secs(60));
        assert_eq!(cache.last_known(None), None);
        assert_eq!(cache.balance(None).await.unwrap(), 3.0);

        storage.store(STORAGE_KEY, "4").unwrap();
        assert_eq!(cache.balance(None).await.unwrap(), 3.0);
        assert_eq!(cache.refresh(None).await.unwrap(), 4.0);
        assert_eq!(cache.last_known(None), Some(4.0));
    }

    #[tokio::test]
    async fn test_stale_served_while_refreshing() {
        let (cache, storage) = mock_cache(Duration::ZERO);
        assert_eq!(cache.balance(None).await.unwrap(), 3.0);

        storage.store(STORAGE_KEY, "8").unwrap();
        assert_eq!(cache.balance(None).await.unwrap(), 3.0);

        for _ in 0..10 {
            if cache.last_known(None) == Some(8.0) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.last_known(None), Some(8.0));
    }

    #[tokio::test]
    async fn test_mutations_update_entry() {
        let (cache, _) = mock_cache(Duration::from_secs(60));
        cache.balance(None).await.unwrap();

        cache.deposit(2.0, None).await.unwrap();
        assert_eq!(cache.last_known(None), Some(5.0));

        assert!(cache.withdraw(50.0, None).await.is_err());
        assert_eq!(cache.last_known(None), Some(5.0));

        assert_eq!(cache.last_known(Some("GANY")), Some(5.0));
        cache.invalidate(Some("GANY"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_value() {
        let ledger = Arc::new(StubLedger::new(20_000_000));
        let wallet = Arc::new(StubWallet::connected("GUSER"));
        let vault = Vault::live(&live_config(), ledger.clone(), wallet).unwrap();
        let cache = Arc::new(BalanceCache::new(Arc::new(vault), Duration::from_secs(60)));

        assert_eq!(cache.balance(Some("GUSER")).await.unwrap(), 2.0);

        ledger.fail_simulations(Some("node restarting"));
        assert!(cache.refresh(Some("GUSER")).await.is_err());
        assert_eq!(cache.last_known(Some("GUSER")), Some(2.0));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_active_account_switch_is_not_served_stale() {
        let ledger = Arc::new(StubLedger::new(20_000_000));
        let wallet = Arc::new(StubWallet::connected("GUSER"));
        let vault = Vault::live(&live_config(), ledger.clone(), wallet.clone()).unwrap();
        let cache = Arc::new(BalanceCache::new(Arc::new(vault), Duration::from_secs(60)));

        assert_eq!(cache.balance(None).await.unwrap(), 2.0);
        assert_eq!(cache.last_known(Some("GUSER")), Some(2.0));
        assert_eq!(cache.last_known(None), None);

        wallet.set_address(Some("GOTHER"));
        cache.balance(None).await.unwrap();
        assert_eq!(ledger.count("simulate"), 2);
        assert_eq!(ledger.simulated_sources(), vec!["GUSER", "GOTHER"]);
        assert_eq!(cache.len(), 2);

        // Back on the first account the cached entry is a hit again.
        wallet.set_address(Some("GUSER"));
        cache.balance(None).await.unwrap();
        assert_eq!(ledger.count("simulate"), 2);
    }

    #[tokio::test]
    async fn test_live_mutation_without_account_keys_by_source() {
        let ledger = Arc::new(StubLedger::new(20_000_000));
        let wallet = Arc::new(StubWallet::connected("GUSER"));
        let vault = Vault::live(&live_config(), ledger, wallet).unwrap();
        let cache = Arc::new(BalanceCache::new(Arc::new(vault), Duration::from_secs(60)));

        let receipt = cache.deposit(1.0, None).await.unwrap();
        assert_eq!(cache.last_known(Some("GUSER")), Some(receipt.new_balance));
        assert_eq!(cache.last_known(None), None);
    }

    #[tokio::test]
    async fn test_unresolvable_account_is_an_error_not_a_shared_entry() {
        let ledger = Arc::new(StubLedger::new(20_000_000));
        let wallet = Arc::new(StubWallet::connected("GUSER"));
        wallet.set_address(None);
        let vault = Vault::live(&live_config(), ledger.clone(), wallet).unwrap();
        let cache = Arc::new(BalanceCache::new(Arc::new(vault), Duration::from_secs(60)));

        assert!(cache.balance(None).await.is_err());
        assert!(cache.is_empty());
        assert_eq!(ledger.total_calls(), 0);
    }
}
