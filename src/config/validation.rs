//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, precision bound)
//! - Require a secure ledger endpoint and identifiers outside mock mode
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VaultConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::amount::MAX_DECIMALS;
use crate::config::schema::VaultConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("asset.decimals {0} exceeds the maximum of 18")]
    Decimals(u8),

    #[error("vault.min_balance must be a finite, non-negative number")]
    MinBalance,

    #[error("ledger.rpc_url '{0}' is not a valid URL")]
    RpcUrl(String),

    #[error("ledger.rpc_url '{0}' must use https")]
    InsecureRpcUrl(String),

    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("wallet.bridge_url '{0}' is not a valid URL")]
    BridgeUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("transactions.poll_interval_ms must be shorter than the confirmation timeout")]
    PollSlowerThanTimeout,
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &VaultConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.asset.decimals > MAX_DECIMALS {
        errors.push(ValidationError::Decimals(config.asset.decimals));
    }
    if !config.vault.min_balance.is_finite() || config.vault.min_balance < 0.0 {
        errors.push(ValidationError::MinBalance);
    }

    let tx = &config.transactions;
    if tx.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("transactions.poll_interval_ms"));
    }
    if tx.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::Zero("transactions.confirmation_timeout_secs"));
    } else if tx.poll_interval() >= tx.confirmation_timeout() {
        errors.push(ValidationError::PollSlowerThanTimeout);
    }
    if config.wallet.watch_interval_ms == 0 {
        errors.push(ValidationError::Zero("wallet.watch_interval_ms"));
    }
    if config.ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero("ledger.rpc_timeout_secs"));
    }

    if !config.vault.mock_mode {
        match Url::parse(&config.ledger.rpc_url) {
            Ok(url) if url.scheme() != "https" => {
                errors.push(ValidationError::InsecureRpcUrl(config.ledger.rpc_url.clone()));
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::RpcUrl(config.ledger.rpc_url.clone())),
        }
        if config.ledger.contract_id.trim().is_empty() {
            errors.push(ValidationError::Missing("ledger.contract_id"));
        }
        if config.ledger.reserve_id.trim().is_empty() {
            errors.push(ValidationError::Missing("ledger.reserve_id"));
        }
        if config.network.expected_passphrase.trim().is_empty() {
            errors.push(ValidationError::Missing("network.expected_passphrase"));
        }
        if Url::parse(&config.wallet.bridge_url).is_err() {
            errors.push(ValidationError::BridgeUrl(config.wallet.bridge_url.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
