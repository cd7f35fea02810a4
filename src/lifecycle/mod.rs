//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build collaborators → Vault + cache + session
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop watcher and refresh loops → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{join_task, Shutdown};
pub use startup::{build_runtime, build_runtime_with_wallet, build_vault, VaultRuntime};
