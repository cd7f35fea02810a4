//! Crate-wide error taxonomy.
//!
//! Boundary-local errors (`AmountError`, `WalletError`, `RpcError`, `ConfigError`) are
//! converted into [`VaultError`] where they cross into the engine or the facade.

use thiserror::Error;

use crate::amount::AmountError;
use crate::config::loader::ConfigError;
use crate::ledger::RpcError;

/// Errors surfaced by the vault read/write entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VaultError {
    /// Non-finite, zero or negative input. Raised before any I/O.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Mock store only: the withdrawal exceeds the stored balance.
    #[error("Amount {requested} exceeds current balance {available}")]
    InsufficientBalance { requested: String, available: String },

    #[error("Wallet not available: {0}")]
    WalletUnavailable(String),

    #[error("Wallet permission denied: {0}")]
    PermissionDenied(String),

    #[error("Wallet returned an empty address. Open the wallet, log in and try again")]
    EmptyAddress,

    /// Warning state. Reads proceed, mutations do not.
    #[error("Wallet is on network '{actual}', expected '{expected}'")]
    WrongNetwork { expected: String, actual: String },

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Withdrawal of {requested} is not feasible after {attempts} simulations: {detail}")]
    WithdrawInfeasible {
        requested: String,
        attempts: u32,
        detail: String,
    },

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// The transaction may still land. Callers must not treat this as a failure.
    #[error("Transaction {tx_hash} not confirmed after {waited_secs}s; outcome unknown, re-check your balance before resubmitting")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("Transaction {tx_hash} failed on ledger: {detail}")]
    ConfirmationFailed { tx_hash: String, detail: String },

    /// Ledger transport failure outside simulation and submission.
    #[error("Ledger RPC error: {0}")]
    Rpc(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Stable label for metrics and machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::InvalidAmount(_) => "invalid_amount",
            VaultError::InsufficientBalance { .. } => "insufficient_balance",
            VaultError::WalletUnavailable(_) => "wallet_unavailable",
            VaultError::PermissionDenied(_) => "permission_denied",
            VaultError::EmptyAddress => "empty_address",
            VaultError::WrongNetwork { .. } => "wrong_network",
            VaultError::SimulationFailed(_) => "simulation_failed",
            VaultError::WithdrawInfeasible { .. } => "withdraw_infeasible",
            VaultError::SigningRejected(_) => "signing_rejected",
            VaultError::SubmissionFailed(_) => "submission_failed",
            VaultError::ConfirmationTimeout { .. } => "confirmation_timeout",
            VaultError::ConfirmationFailed { .. } => "confirmation_failed",
            VaultError::Rpc(_) => "rpc",
            VaultError::Storage(_) => "storage",
            VaultError::Config(_) => "config",
        }
    }

    /// True when the ledger may still apply the transaction.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, VaultError::ConfirmationTimeout { .. })
    }

    /// True for states shown as a persistent warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, VaultError::WrongNetwork { .. })
    }
}

impl From<AmountError> for VaultError {
    fn from(e: AmountError) -> Self {
        VaultError::InvalidAmount(e.to_string())
    }
}

impl From<RpcError> for VaultError {
    fn from(e: RpcError) -> Self {
        VaultError::Rpc(e.to_string())
    }
}

impl From<ConfigError> for VaultError {
    fn from(e: ConfigError) -> Self {
        VaultError::Config(e.to_string())
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
