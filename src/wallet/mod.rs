//! Wallet session subsystem.
//!
//! # Data Flow
//! ```text
//! extension.rs (WalletExtension trait, address resolution)
//!     ← bridge.rs (HTTP bridge to the extension host)
//!     → session.rs (SessionMonitor: snapshot, derived state, network check)
//!     → watcher.rs (interval probe, refresh on change)
//! ```
//!
//! # Design Decisions
//! - Snapshot is swapped whole (ArcSwap); readers never see half an update
//! - A failed refresh keeps the last good snapshot and records the error
//! - Network identity is the passphrase, not the display name

pub mod bridge;
pub mod extension;
pub mod session;
pub mod watcher;

pub use bridge::HttpWalletBridge;
pub use extension::{
    resolve_address, NetworkDetails, NetworkIdentity, WalletError, WalletExtension, WalletResult,
};
pub use session::{SessionMonitor, SessionProbe, SessionState, WalletSnapshot};
pub use watcher::{WalletWatcher, WatcherHandle};
