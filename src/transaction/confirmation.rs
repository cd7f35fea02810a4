//! Confirmation polling for submitted transactions.

use std::time::Duration;

use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

use crate::config::TransactionConfig;
use crate::error::{VaultError, VaultResult};
use crate::ledger::{CallArg, LedgerRpc, TxStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: String,
    pub ledger: u64,
    pub return_value: Option<CallArg>,
    pub polls: u32,
}

/// Polls transaction status at a fixed interval until a terminal status or
/// the deadline.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPoller {
    poll_interval: Duration,
    deadline: Duration,
}

impl ConfirmationPoller {
    pub fn new(poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            poll_interval,
            deadline,
        }
    }

    pub fn from_config(config: &TransactionConfig) -> Self {
        Self::new(config.poll_interval(), config.confirmation_timeout())
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Wait for `tx_hash` to reach a terminal status.
    ///
    /// Transport errors while polling are logged and polling continues; only
    /// the deadline ends an undecided wait, with
    /// [`VaultError::ConfirmationTimeout`].
    pub async fn wait(&self, ledger: &dyn LedgerRpc, tx_hash: &str) -> VaultResult<Confirmation> {
        let started = Instant::now();

        let result = timeout(self.deadline, async {
            let mut polls = 0u32;
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                polls += 1;

                match ledger.status(tx_hash).await {
                    Ok(TxStatus::Pending) => {
                        tracing::debug!(tx_hash = %tx_hash, polls, "Transaction pending");
                    }
                    Ok(TxStatus::Success {
                        ledger,
                        return_value,
                    }) => {
                        return Ok(Confirmation {
                            tx_hash: tx_hash.to_string(),
                            ledger,
                            return_value,
                            polls,
                        });
                    }
                    Ok(TxStatus::Failed { detail, .. }) => {
                        return Err(VaultError::ConfirmationFailed {
                            tx_hash: tx_hash.to_string(),
                            detail,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Status poll failed, will retry");
                    }
                }
            }
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                let waited = started.elapsed();
                tracing::warn!(
                    tx_hash = %tx_hash,
                    waited_secs = waited.as_secs(),
                    "Transaction not confirmed before deadline; outcome unknown"
                );
                Err(VaultError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: waited.as_secs(),
                })
            }
        }
    }
}
