//! Wallet extension boundary.
//!
//! The extension holds the keys. This layer only asks it questions and asks
//! it to sign; every call may suspend on a user prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{VaultError, VaultResult};

/// Network the extension reports it is pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDetails {
    pub network: String,
    pub network_passphrase: String,
    #[serde(default)]
    pub network_url: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl NetworkDetails {
    pub fn identity(&self) -> NetworkIdentity {
        NetworkIdentity {
            name: self.network.clone(),
            passphrase: self.network_passphrase.clone(),
        }
    }
}

/// Name/passphrase pair. The passphrase is what identifies a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub name: String,
    pub passphrase: String,
}

impl NetworkIdentity {
    pub fn matches(&self, details: &NetworkDetails) -> bool {
        self.passphrase == details.network_passphrase
    }
}

/// Failures reported by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Explicit "not available" signal: no extension, or it does not support the call.
    #[error("wallet extension not available")]
    NotAvailable,

    /// The user declined a prompt.
    #[error("rejected by user: {0}")]
    Rejected(String),

    #[error("wallet error: {0}")]
    Failed(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Whether an extension is installed and reachable.
    async fn is_present(&self) -> WalletResult<bool>;

    /// Whether this app is on the extension's allow list.
    async fn is_allowed(&self) -> WalletResult<bool>;

    /// Ask the user to allow this app. Prompts.
    async fn request_allowed(&self) -> WalletResult<bool>;

    /// Ask for the active address, prompting for login if needed.
    async fn request_access(&self) -> WalletResult<Option<String>>;

    /// Active address without prompting; `None` when not authorized or logged out.
    async fn get_address(&self) -> WalletResult<Option<String>>;

    async fn network_details(&self) -> WalletResult<NetworkDetails>;

    /// Sign an encoded transaction. Prompts. Returns the signed envelope.
    async fn sign_transaction(
        &self,
        payload: &str,
        network_passphrase: &str,
        address: &str,
    ) -> WalletResult<String>;
}

/// Active address: silent lookup first, then the prompting access request.
pub async fn resolve_address(wallet: &dyn WalletExtension) -> VaultResult<String> {
    match wallet.get_address().await {
        Ok(Some(address)) if !address.is_empty() => return Ok(address),
        Ok(_) => {}
        Err(WalletError::NotAvailable) => {
            return Err(VaultError::WalletUnavailable(
                "no wallet extension detected".to_string(),
            ))
        }
        Err(e) => tracing::debug!(error = %e, "Silent address lookup failed, requesting access"),
    }

    match wallet.request_access().await {
        Ok(Some(address)) if !address.is_empty() => Ok(address),
        Ok(_) => Err(VaultError::EmptyAddress),
        Err(e) => Err(access_error(e)),
    }
}

pub(crate) fn access_error(e: WalletError) -> VaultError {
    match e {
        WalletError::NotAvailable => {
            VaultError::WalletUnavailable("no wallet extension detected".to_string())
        }
        WalletError::Rejected(reason) => VaultError::PermissionDenied(reason),
        WalletError::Failed(reason) => VaultError::WalletUnavailable(reason),
    }
}

/// Map signing failures onto the vault taxonomy.
pub(crate) fn signing_error(e: WalletError) -> VaultError {
    match e {
        WalletError::NotAvailable => {
            VaultError::WalletUnavailable("wallet cannot sign right now".to_string())
        }
        WalletError::Rejected(reason) | WalletError::Failed(reason) => {
            VaultError::SigningRejected(reason)
        }
    }
}
