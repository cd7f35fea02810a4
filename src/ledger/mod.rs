//! Ledger RPC subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionEngine
//!     → rpc.rs (LedgerRpc trait: account, simulate, prepare, submit, status)
//!     → client.rs (JSON-RPC 2.0 over HTTP, per-call timeout)
//!     → Ledger node
//! ```
//!
//! # Design Decisions
//! - Amounts are i128 base units on the wire, as decimal strings
//! - Simulation failure is a value, transport failure is an error

pub mod client;
pub mod rpc;
pub mod types;

pub use client::JsonRpcLedgerClient;
pub use rpc::{LedgerRpc, RpcError, RpcResult};
pub use types::{
    AccountInfo, CallArg, ContractCall, LedgerTransaction, Prepared, ResourceFootprint,
    SignedTransaction, Simulation, SimulationSuccess, Submission, TxStatus, VaultOperation,
};
