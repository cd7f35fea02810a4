//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::VaultConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then `VAULT_*` environment
/// overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<VaultConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => VaultConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file, without env overrides.
pub fn load_config(path: &Path) -> Result<VaultConfig, ConfigError> {
    let config = parse_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<VaultConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut VaultConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("VAULT_RPC_URL") {
        config.ledger.rpc_url = v;
    }
    if let Some(v) = lookup("VAULT_CONTRACT_ID") {
        config.ledger.contract_id = v;
    }
    if let Some(v) = lookup("VAULT_RESERVE_ID") {
        config.ledger.reserve_id = v;
    }
    if let Some(v) = lookup("VAULT_ASSET_DECIMALS") {
        config.asset.decimals = v.trim().parse().map_err(|_| ConfigError::Env {
            var: "VAULT_ASSET_DECIMALS",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("VAULT_MIN_BALANCE") {
        config.vault.min_balance = v.trim().parse().map_err(|_| ConfigError::Env {
            var: "VAULT_MIN_BALANCE",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("VAULT_USE_MOCK") {
        config.vault.mock_mode = parse_flag(&v).ok_or(ConfigError::Env {
            var: "VAULT_USE_MOCK",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("VAULT_NETWORK_PASSPHRASE") {
        config.network.expected_passphrase = v;
    }
    if let Some(v) = lookup("VAULT_NETWORK_NAME") {
        config.network.expected_name = v;
    }
    if let Some(v) = lookup("VAULT_WALLET_BRIDGE_URL") {
        config.wallet.bridge_url = v;
    }
    if let Some(v) = lookup("VAULT_MOCK_STATE_PATH") {
        config.mock.state_path = v;
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
