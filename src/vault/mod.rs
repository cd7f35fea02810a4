//! Vault facade subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (daemon, CLI, tests)
//!     → cache.rs (per-account last-known balance, stale-while-refresh)
//!     → facade.rs (routes to mock store or transaction engine)
//!         → mock::MockLedgerStore | transaction::TransactionEngine
//! ```
//!
//! # Design Decisions
//! - Mode is fixed at construction from configuration
//! - Live mutations report the re-read ledger balance, not a local sum

pub mod cache;
pub mod facade;

pub use cache::{AccountKey, BalanceCache};
pub use facade::{MutationReceipt, Vault, VaultBackend};
