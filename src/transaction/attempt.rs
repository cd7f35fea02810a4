//! Per-mutation lifecycle record.

use std::fmt;
use std::time::Instant;

use uuid::Uuid;

use crate::amount::FixedPoint;
use crate::error::VaultError;
use crate::ledger::VaultOperation;

/// Stages only move forward; `Failed` and `TimedOut` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttemptStage {
    Built,
    Simulated,
    Prepared,
    Signed,
    Submitted,
    Confirmed,
    Failed,
    TimedOut,
}

impl AttemptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStage::Built => "built",
            AttemptStage::Simulated => "simulated",
            AttemptStage::Prepared => "prepared",
            AttemptStage::Signed => "signed",
            AttemptStage::Submitted => "submitted",
            AttemptStage::Confirmed => "confirmed",
            AttemptStage::Failed => "failed",
            AttemptStage::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStage::Confirmed | AttemptStage::Failed | AttemptStage::TimedOut
        )
    }
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deposit or withdraw going through build → confirm.
#[derive(Debug, Clone)]
pub struct TransactionAttempt {
    id: Uuid,
    operation: VaultOperation,
    requested: FixedPoint,
    amount: FixedPoint,
    stage: AttemptStage,
    tx_hash: Option<String>,
    started: Instant,
}

impl TransactionAttempt {
    pub fn new(operation: VaultOperation, requested: FixedPoint) -> Self {
        let attempt = Self {
            id: Uuid::new_v4(),
            operation,
            requested,
            amount: requested,
            stage: AttemptStage::Built,
            tx_hash: None,
            started: Instant::now(),
        };
        tracing::debug!(
            attempt_id = %attempt.id,
            operation = %operation,
            amount = %requested,
            "Transaction attempt started"
        );
        attempt
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn operation(&self) -> VaultOperation {
        self.operation
    }

    pub fn requested(&self) -> FixedPoint {
        self.requested
    }

    /// Amount currently being attempted; may be below `requested` for withdrawals.
    pub fn amount(&self) -> FixedPoint {
        self.amount
    }

    pub fn stage(&self) -> AttemptStage {
        self.stage
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Move forward to `next`. Backward or post-terminal moves are ignored
    /// and return false.
    pub fn advance(&mut self, next: AttemptStage) -> bool {
        if self.stage.is_terminal() || next < self.stage {
            tracing::warn!(
                attempt_id = %self.id,
                from = %self.stage,
                to = %next,
                "Ignoring out-of-order attempt transition"
            );
            return false;
        }
        if next != self.stage {
            tracing::debug!(
                attempt_id = %self.id,
                operation = %self.operation,
                stage = %next,
                "Transaction attempt advanced"
            );
            self.stage = next;
        }
        true
    }

    /// Lower the attempted amount during withdraw feasibility search.
    pub fn reduce_to(&mut self, amount: FixedPoint) {
        if self.stage < AttemptStage::Prepared {
            self.amount = amount;
        }
    }

    pub fn record_submission(&mut self, hash: &str) {
        self.tx_hash = Some(hash.to_string());
        self.advance(AttemptStage::Submitted);
    }

    /// Terminal failure stage for `error`.
    pub fn fail(&mut self, error: &VaultError) {
        let terminal = if matches!(error, VaultError::ConfirmationTimeout { .. }) {
            AttemptStage::TimedOut
        } else {
            AttemptStage::Failed
        };
        self.advance(terminal);
    }
}
