//! Vault ledger integration layer.
//!
//! Reads and mutates a per-user vault balance held by a ledger contract, or a
//! local mock when no ledger is configured, and tracks the browser wallet
//! session that signs for it.

pub mod amount;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod mock;
pub mod observability;
pub mod transaction;
pub mod vault;
pub mod wallet;

#[cfg(test)]
mod test_helpers;

pub use config::schema::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use lifecycle::Shutdown;
pub use vault::{BalanceCache, MutationReceipt, Vault};
