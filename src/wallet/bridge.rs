//! HTTP bridge to a locally running wallet extension host.
//!
//! Each extension call is a `POST {bridge_url}/{method}` with a JSON body.
//! The bridge answers `{"ok": <value>}` or
//! `{"error": {"kind": "not_available" | "rejected" | "failed", "message": "..."}}`.
//!
//! # Design Decisions
//! - A refused connection is the "no extension" signal
//! - Calls that may prompt the user have no request timeout

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::WalletConfig;
use crate::error::{VaultError, VaultResult};
use crate::wallet::extension::{NetworkDetails, WalletError, WalletExtension, WalletResult};

pub struct HttpWalletBridge {
    http: reqwest::Client,
    base: Url,
    probe_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BridgeReply<T> {
    Ok(T),
    Error(BridgeFailure),
}

#[derive(Debug, Deserialize)]
struct BridgeFailure {
    kind: FailureKind,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FailureKind {
    NotAvailable,
    Rejected,
    Failed,
}

impl<T> BridgeReply<T> {
    fn into_result(self) -> WalletResult<T> {
        match self {
            BridgeReply::Ok(value) => Ok(value),
            BridgeReply::Error(failure) => Err(match failure.kind {
                FailureKind::NotAvailable => WalletError::NotAvailable,
                FailureKind::Rejected => WalletError::Rejected(failure.message),
                FailureKind::Failed => WalletError::Failed(failure.message),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AddressReply {
    #[serde(default)]
    address: String,
}

impl AddressReply {
    fn into_address(self) -> Option<String> {
        Some(self.address).filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    transaction: &'a str,
    network_passphrase: &'a str,
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignReply {
    signed_transaction: String,
}

#[derive(Debug, Serialize)]
struct NoParams {}

impl HttpWalletBridge {
    pub fn new(base_url: &str, probe_timeout: Duration) -> VaultResult<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| VaultError::Config(format!("invalid wallet bridge url {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build wallet bridge client: {}", e)))?;

        Ok(Self {
            http,
            base,
            probe_timeout,
        })
    }

    pub fn from_config(config: &WalletConfig) -> VaultResult<Self> {
        Self::new(
            &config.bridge_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P, prompts: bool) -> WalletResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self
            .base
            .join(method)
            .map_err(|e| WalletError::Failed(format!("invalid bridge method {}: {}", method, e)))?;

        let mut request = self.http.post(url).json(params);
        if !prompts {
            request = request.timeout(self.probe_timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                WalletError::NotAvailable
            } else if e.is_timeout() {
                WalletError::Failed(format!("{} timed out", method))
            } else {
                WalletError::Failed(e.to_string())
            }
        })?;

        let reply: BridgeReply<R> = response
            .json()
            .await
            .map_err(|e| WalletError::Failed(format!("malformed bridge reply to {}: {}", method, e)))?;
        reply.into_result()
    }
}

#[async_trait]
impl WalletExtension for HttpWalletBridge {
    async fn is_present(&self) -> WalletResult<bool> {
        match self.call("is_connected", &NoParams {}, false).await {
            Err(WalletError::NotAvailable) => Ok(false),
            other => other,
        }
    }

    async fn is_allowed(&self) -> WalletResult<bool> {
        self.call("is_allowed", &NoParams {}, false).await
    }

    async fn request_allowed(&self) -> WalletResult<bool> {
        self.call("set_allowed", &NoParams {}, true).await
    }

    async fn request_access(&self) -> WalletResult<Option<String>> {
        let reply: AddressReply = self.call("request_access", &NoParams {}, true).await?;
        Ok(reply.into_address())
    }

    async fn get_address(&self) -> WalletResult<Option<String>> {
        let reply: AddressReply = self.call("get_address", &NoParams {}, false).await?;
        Ok(reply.into_address())
    }

    async fn network_details(&self) -> WalletResult<NetworkDetails> {
        self.call("get_network_details", &NoParams {}, false).await
    }

    async fn sign_transaction(
        &self,
        payload: &str,
        network_passphrase: &str,
        address: &str,
    ) -> WalletResult<String> {
        let request = SignRequest {
            transaction: payload,
            network_passphrase,
            address,
        };
        let reply: SignReply = self.call("sign_transaction", &request, true).await?;
        Ok(reply.signed_transaction)
    }
}
