//! Wallet session snapshot and the monitor that keeps it current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::error::{VaultError, VaultResult};
use crate::observability::metrics;
use crate::wallet::extension::{
    access_error, NetworkDetails, NetworkIdentity, WalletError, WalletExtension, WalletResult,
};

/// Derived connection state, a pure function of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoExtension,
    Unauthorized,
    AuthorizedNoAddress,
    Connected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NoExtension => "no_extension",
            SessionState::Unauthorized => "unauthorized",
            SessionState::AuthorizedNoAddress => "authorized_no_address",
            SessionState::Connected => "connected",
        }
    }
}

/// Last observed wallet facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletSnapshot {
    pub has_extension: bool,
    pub allowed: bool,
    pub address: Option<String>,
    pub network: Option<NetworkDetails>,
    /// Last refresh or connect failure; cleared by the next successful refresh.
    pub error: Option<String>,
}

impl WalletSnapshot {
    pub fn state(&self) -> SessionState {
        if !self.has_extension {
            SessionState::NoExtension
        } else if !self.allowed {
            SessionState::Unauthorized
        } else if self.address.is_none() {
            SessionState::AuthorizedNoAddress
        } else {
            SessionState::Connected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// True only when a network was observed and its passphrase differs.
    pub fn is_wrong_network(&self, expected: &NetworkIdentity) -> bool {
        self.network
            .as_ref()
            .is_some_and(|details| !expected.matches(details))
    }
}

/// Address and network as cheaply probed by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProbe {
    pub address: Option<String>,
    pub passphrase: Option<String>,
}

/// Owns the current [`WalletSnapshot`] and publishes changes.
pub struct SessionMonitor {
    wallet: Arc<dyn WalletExtension>,
    expected: NetworkIdentity,
    current: ArcSwap<WalletSnapshot>,
    /// Set by `disconnect`; hides the address until the next `connect`.
    detached: AtomicBool,
    changes: broadcast::Sender<Arc<WalletSnapshot>>,
    refresh_lock: Mutex<()>,
}

impl SessionMonitor {
    pub fn new(wallet: Arc<dyn WalletExtension>, expected: NetworkIdentity) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            wallet,
            expected,
            current: ArcSwap::from_pointee(WalletSnapshot::default()),
            detached: AtomicBool::new(false),
            changes,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<WalletSnapshot> {
        self.current.load_full()
    }

    pub fn state(&self) -> SessionState {
        self.current.load().state()
    }

    pub fn expected(&self) -> &NetworkIdentity {
        &self.expected
    }

    /// Wallet is on a network other than the expected one. Never true before a
    /// network has been observed.
    pub fn wrong_network(&self) -> bool {
        self.current.load().is_wrong_network(&self.expected)
    }

    /// The address to act for, if connected.
    pub fn active_address(&self) -> Option<String> {
        let snapshot = self.current.load();
        if snapshot.is_connected() {
            snapshot.address.clone()
        } else {
            None
        }
    }

    /// Receive every snapshot that differs from its predecessor.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<WalletSnapshot>> {
        self.changes.subscribe()
    }

    /// Re-read all wallet facts. On any failure the previous snapshot is kept
    /// and only its `error` field is updated.
    pub async fn refresh(&self) -> Arc<WalletSnapshot> {
        let _guard = self.refresh_lock.lock().await;

        let next = match self.observe().await {
            Ok(snapshot) => {
                metrics::record_wallet_refresh("ok");
                snapshot
            }
            Err(e) => {
                metrics::record_wallet_refresh("error");
                tracing::warn!(error = %e, "Wallet refresh failed, keeping last snapshot");
                let mut kept = (**self.current.load()).clone();
                kept.error = Some(e.to_string());
                kept
            }
        };

        if next.is_wrong_network(&self.expected) {
            tracing::warn!(
                expected = %self.expected.name,
                actual = next.network.as_ref().map(|n| n.network.as_str()).unwrap_or_default(),
                "Wallet is connected to a different network"
            );
        }

        self.publish(next)
    }

    /// Ask for permission if needed, then for the address. Prompts the user.
    pub async fn connect(&self) -> VaultResult<String> {
        match self.authorize().await {
            Ok(address) => {
                self.detached.store(false, Ordering::SeqCst);
                self.refresh().await;
                tracing::info!(address = %address, "Wallet connected");
                Ok(address)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connect failed");
                let mut failed = (**self.current.load()).clone();
                failed.error = Some(e.to_string());
                self.publish(failed);
                Err(e)
            }
        }
    }

    /// Forget the address locally. The extension's allow list is untouched.
    pub fn disconnect(&self) -> Arc<WalletSnapshot> {
        self.detached.store(true, Ordering::SeqCst);
        let mut next = (**self.current.load()).clone();
        next.address = None;
        tracing::info!("Wallet disconnected");
        self.publish(next)
    }

    /// Address and network passphrase, errors read as absent.
    pub async fn probe(&self) -> SessionProbe {
        let address = if self.detached.load(Ordering::SeqCst) {
            None
        } else {
            self.wallet.get_address().await.ok().flatten()
        };
        let passphrase = self
            .wallet
            .network_details()
            .await
            .ok()
            .map(|details| details.network_passphrase);
        SessionProbe {
            address,
            passphrase,
        }
    }

    async fn observe(&self) -> WalletResult<WalletSnapshot> {
        let has_extension = match self.wallet.is_present().await {
            Ok(present) => present,
            Err(WalletError::NotAvailable) => false,
            Err(e) => return Err(e),
        };
        if !has_extension {
            return Ok(WalletSnapshot::default());
        }

        let allowed = self.wallet.is_allowed().await?;
        let address = if self.detached.load(Ordering::SeqCst) {
            None
        } else {
            self.wallet.get_address().await?.filter(|a| !a.is_empty())
        };
        let network = match self.wallet.network_details().await {
            Ok(details) => Some(details),
            Err(WalletError::NotAvailable) => None,
            Err(e) => return Err(e),
        };

        Ok(WalletSnapshot {
            has_extension,
            allowed,
            address,
            network,
            error: None,
        })
    }

    async fn authorize(&self) -> VaultResult<String> {
        match self.wallet.is_present().await {
            Ok(true) => {}
            Ok(false) | Err(WalletError::NotAvailable) => {
                return Err(VaultError::WalletUnavailable(
                    "no wallet extension detected".to_string(),
                ))
            }
            Err(e) => return Err(VaultError::WalletUnavailable(e.to_string())),
        }

        let allowed = self.wallet.is_allowed().await.map_err(access_error)?;
        if !allowed {
            let granted = self.wallet.request_allowed().await.map_err(access_error)?;
            if !granted {
                return Err(VaultError::PermissionDenied(
                    "the wallet did not allow this app".to_string(),
                ));
            }
        }

        match self.wallet.request_access().await {
            Ok(Some(address)) if !address.is_empty() => Ok(address),
            Ok(_) => Err(VaultError::EmptyAddress),
            Err(e) => Err(access_error(e)),
        }
    }

    fn publish(&self, next: WalletSnapshot) -> Arc<WalletSnapshot> {
        let next = Arc::new(next);
        let previous = self.current.swap(next.clone());
        if *previous != *next {
            if previous.state() != next.state() {
                tracing::info!(
                    from = previous.state().as_str(),
                    to = next.state().as_str(),
                    "Wallet session state changed"
                );
            }
            let _ = self.changes.send(next.clone());
        }
        next
    }
}
