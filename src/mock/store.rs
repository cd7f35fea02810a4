//! Local persisted balance used when no live ledger is configured.

use std::sync::{Arc, Mutex};

use crate::amount::{positive_fixed, FixedPoint, Precision};
use crate::error::{VaultError, VaultResult};
use crate::mock::storage::BalanceStorage;
use crate::observability::metrics;

/// Default namespaced storage key.
pub const STORAGE_KEY: &str = "vault_balance_v1";

/// Outcome of a mock mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockMutation {
    /// Amount applied after truncation to the asset precision.
    pub applied: FixedPoint,
    pub balance: FixedPoint,
}

/// Single-account balance kept in a [`BalanceStorage`].
///
/// Arithmetic is done in fixed point, so a deposit followed by a withdrawal of
/// the same amount restores the previous balance exactly.
pub struct MockLedgerStore {
    storage: Arc<dyn BalanceStorage>,
    key: String,
    precision: Precision,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl MockLedgerStore {
    pub fn new(storage: Arc<dyn BalanceStorage>, key: impl Into<String>, precision: Precision) -> Self {
        Self {
            storage,
            key: key.into(),
            precision,
            write_lock: Mutex::new(()),
        }
    }

    /// Current balance. Missing, unreadable or corrupt state reads as zero.
    pub fn read(&self) -> f64 {
        self.read_fixed().to_human()
    }

    pub fn read_fixed(&self) -> FixedPoint {
        let zero = FixedPoint::zero(self.precision);
        let raw = match self.storage.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return zero,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Mock balance unreadable, using zero");
                return zero;
            }
        };
        match decode(&raw, self.precision) {
            Some(value) if value.is_negative() => zero,
            Some(value) => value,
            None => {
                tracing::warn!(key = %self.key, raw = %raw, "Mock balance corrupt, using zero");
                zero
            }
        }
    }

    /// Overwrite the stored balance, rounded to the configured precision.
    pub fn write(&self, new_balance: f64) -> VaultResult<()> {
        if !new_balance.is_finite() {
            return Err(VaultError::InvalidAmount(format!(
                "balance {} is not finite",
                new_balance
            )));
        }
        let rounded = format!("{:.*}", self.precision.decimals() as usize, new_balance);
        let value = FixedPoint::parse(&rounded, self.precision)?;
        let _guard = self.lock();
        self.persist(&value)
    }

    /// Add `amount`, truncated to the asset precision.
    pub fn deposit(&self, amount: f64) -> VaultResult<MockMutation> {
        let amount = positive_fixed(amount, self.precision)?;
        let _guard = self.lock();
        let current = self.read_fixed();
        let next = current.checked_add(&amount).ok_or_else(|| {
            VaultError::InvalidAmount("deposit overflows the balance range".to_string())
        })?;
        self.persist(&next)?;
        metrics::record_mock_operation("deposit", "ok");
        tracing::debug!(amount = %amount, balance = %next, "Mock deposit");
        Ok(MockMutation {
            applied: amount,
            balance: next,
        })
    }

    /// Subtract `amount`. The untruncated request is checked against the
    /// balance, so excess below one unit is still refused.
    pub fn withdraw(&self, requested: f64) -> VaultResult<MockMutation> {
        let amount = positive_fixed(requested, self.precision)?;
        let _guard = self.lock();
        let current = self.read_fixed();
        if amount > current || requested > current.to_human() {
            metrics::record_mock_operation("withdraw", "insufficient_balance");
            return Err(VaultError::InsufficientBalance {
                requested: requested.to_string(),
                available: current.to_string(),
            });
        }
        let next = current.checked_sub(&amount).ok_or_else(|| {
            VaultError::InvalidAmount("withdraw overflows the balance range".to_string())
        })?;
        self.persist(&next)?;
        metrics::record_mock_operation("withdraw", "ok");
        tracing::debug!(amount = %amount, balance = %next, "Mock withdraw");
        Ok(MockMutation {
            applied: amount,
            balance: next,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    fn persist(&self, value: &FixedPoint) -> VaultResult<()> {
        self.storage
            .store(&self.key, &value.to_string())
            .map_err(|e| VaultError::Storage(e.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Decimal string first, then any float notation (e.g. `1e-7`).
fn decode(raw: &str, precision: Precision) -> Option<FixedPoint> {
    let cleaned = raw.trim().trim_matches('"');
    if let Ok(value) = FixedPoint::parse(cleaned, precision) {
        return Some(value);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .and_then(|v| FixedPoint::from_human(v, precision).ok())
}
