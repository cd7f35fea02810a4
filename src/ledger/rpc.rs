//! Ledger RPC seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::types::{
    AccountInfo, LedgerTransaction, Prepared, SignedTransaction, Simulation, Submission, TxStatus,
};

/// Errors talking to the ledger RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Connection or HTTP-level failure.
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Contract-capable ledger node.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Source account with its current sequence number.
    async fn account(&self, address: &str) -> RpcResult<AccountInfo>;

    /// Dry-run a transaction. No state changes, nothing signed.
    async fn simulate(&self, tx: &LedgerTransaction) -> RpcResult<Simulation>;

    /// Simulate and attach footprint and resource fee, ready for signing.
    async fn prepare(&self, tx: &LedgerTransaction) -> RpcResult<Prepared>;

    async fn submit(&self, signed: &SignedTransaction) -> RpcResult<Submission>;

    async fn status(&self, hash: &str) -> RpcResult<TxStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RpcError::Timeout(10).to_string(), "RPC timeout after 10 seconds");
        let err = RpcError::Remote {
            code: -32602,
            message: "invalid params".into(),
        };
        assert_eq!(err.to_string(), "RPC error -32602: invalid params");
    }
}
