//! JSON-RPC 2.0 client for a contract-capable ledger node.
//!
//! # Responsibilities
//! - Wrap every call in the configured request timeout
//! - Map node responses onto the domain types in `types.rs`
//! - Never retry; callers decide what a failure means

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;
use url::Url;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{VaultError, VaultResult};
use crate::ledger::rpc::{LedgerRpc, RpcError, RpcResult};
use crate::ledger::types::{
    AccountInfo, CallArg, LedgerTransaction, Prepared, ResourceFootprint, SignedTransaction,
    Simulation, SimulationSuccess, Submission, TxStatus,
};

#[derive(Clone)]
pub struct JsonRpcLedgerClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout_duration: Duration,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

impl<R> JsonRpcResponse<R> {
    fn into_result(self, method: &str) -> RpcResult<R> {
        if let Some(error) = self.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        self.result
            .ok_or_else(|| RpcError::Malformed(format!("{} returned neither result nor error", method)))
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    id: String,
    sequence: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    error: Option<String>,
    #[serde(default)]
    results: Vec<SimulateResult>,
    min_resource_fee: Option<String>,
    transaction_data: Option<ResourceFootprint>,
    #[serde(default)]
    latest_ledger: u64,
}

#[derive(Debug, Deserialize)]
struct SimulateResult {
    retval: Option<CallArg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    status: String,
    hash: Option<String>,
    error_result: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionResponse {
    status: String,
    ledger: Option<u64>,
    return_value: Option<CallArg>,
    result: Option<String>,
}

impl JsonRpcLedgerClient {
    pub fn new(config: &LedgerConfig) -> VaultResult<Self> {
        let endpoint: Url = config.rpc_url.parse().map_err(|e| {
            VaultError::Config(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| VaultError::Config(format!("failed to build RPC client: {}", e)))?;

        tracing::info!(rpc_url = %endpoint, "Ledger RPC client initialized");

        Ok(Self {
            http,
            endpoint,
            timeout_duration: config.rpc_timeout(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4().to_string(),
            method,
            params,
        };

        let exchange = async {
            let response = self
                .http
                .post(self.endpoint.clone())
                .json(&request)
                .send()
                .await
                .map_err(|e| RpcError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RpcError::Transport(format!("{} returned HTTP {}", method, status)));
            }

            let body: JsonRpcResponse<R> = response
                .json()
                .await
                .map_err(|e| RpcError::Malformed(e.to_string()))?;
            body.into_result(method)
        };

        match timeout(self.timeout_duration, exchange).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::debug!(method, error = %e, "RPC call failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(method, "RPC timeout");
                Err(RpcError::Timeout(self.timeout_duration.as_secs()))
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcLedgerClient {
    async fn account(&self, address: &str) -> RpcResult<AccountInfo> {
        let response: AccountResponse = self.call("getAccount", json!({ "address": address })).await?;
        account_from_wire(response)
    }

    async fn simulate(&self, tx: &LedgerTransaction) -> RpcResult<Simulation> {
        let encoded = tx.encode().map_err(|e| RpcError::Malformed(e.to_string()))?;
        let response: SimulateResponse = self
            .call("simulateTransaction", json!({ "transaction": encoded }))
            .await?;
        simulation_from_wire(response)
    }

    async fn prepare(&self, tx: &LedgerTransaction) -> RpcResult<Prepared> {
        Ok(match self.simulate(tx).await? {
            Simulation::Success(success) => Prepared::Ready(tx.assemble(&success)),
            Simulation::Failure { diagnostic } => Prepared::Failed { diagnostic },
        })
    }

    async fn submit(&self, signed: &SignedTransaction) -> RpcResult<Submission> {
        let response: SendResponse = self
            .call("sendTransaction", json!({ "transaction": signed.envelope }))
            .await?;
        submission_from_wire(response)
    }

    async fn status(&self, hash: &str) -> RpcResult<TxStatus> {
        let response: GetTransactionResponse =
            self.call("getTransaction", json!({ "hash": hash })).await?;
        status_from_wire(response)
    }
}

fn account_from_wire(response: AccountResponse) -> RpcResult<AccountInfo> {
    let sequence = response
        .sequence
        .parse()
        .map_err(|_| RpcError::Malformed(format!("bad account sequence {:?}", response.sequence)))?;
    Ok(AccountInfo {
        id: response.id,
        sequence,
    })
}

fn simulation_from_wire(response: SimulateResponse) -> RpcResult<Simulation> {
    if let Some(diagnostic) = response.error {
        return Ok(Simulation::Failure { diagnostic });
    }
    let min_resource_fee = match response.min_resource_fee {
        Some(raw) => raw
            .parse()
            .map_err(|_| RpcError::Malformed(format!("bad minResourceFee {:?}", raw)))?,
        None => 0,
    };
    let return_value = response.results.into_iter().next().and_then(|r| r.retval);
    Ok(Simulation::Success(SimulationSuccess {
        return_value,
        min_resource_fee,
        footprint: response.transaction_data.unwrap_or_default(),
        latest_ledger: response.latest_ledger,
    }))
}

fn submission_from_wire(response: SendResponse) -> RpcResult<Submission> {
    match response.status.as_str() {
        "PENDING" | "DUPLICATE" => match response.hash {
            Some(hash) if !hash.is_empty() => Ok(Submission::Accepted { hash }),
            _ => Err(RpcError::Malformed(
                "accepted submission without a hash".to_string(),
            )),
        },
        "TRY_AGAIN_LATER" => Ok(Submission::Rejected {
            hash: response.hash,
            detail: "node asked to try again later".to_string(),
        }),
        other => Ok(Submission::Rejected {
            hash: response.hash,
            detail: response
                .error_result
                .unwrap_or_else(|| format!("submission status {}", other)),
        }),
    }
}

fn status_from_wire(response: GetTransactionResponse) -> RpcResult<TxStatus> {
    match response.status.as_str() {
        "NOT_FOUND" | "PENDING" => Ok(TxStatus::Pending),
        "SUCCESS" => Ok(TxStatus::Success {
            ledger: response.ledger.unwrap_or_default(),
            return_value: response.return_value,
        }),
        "FAILED" => Ok(TxStatus::Failed {
            ledger: response.ledger,
            detail: response
                .result
                .unwrap_or_else(|| "transaction failed".to_string()),
        }),
        other => Err(RpcError::Malformed(format!("unknown transaction status {}", other))),
    }
}
