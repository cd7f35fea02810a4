//! Mock ledger subsystem.
//!
//! # Data Flow
//! ```text
//! Vault (mock mode)
//!     → store.rs (validate, fixed-point read-modify-write)
//!     → storage.rs (FileStorage JSON file | MemoryStorage)
//! ```
//!
//! # Design Decisions
//! - One namespaced key holds the balance as a decimal string
//! - Corrupt or missing state reads as zero and is never surfaced
//! - Single process, single account; no cross-process coordination

pub mod storage;
pub mod store;

pub use storage::{BalanceStorage, FileStorage, MemoryStorage};
pub use store::{MockLedgerStore, MockMutation, STORAGE_KEY};
