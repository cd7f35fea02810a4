//! Shared utilities for integration testing.
//!
//! `LedgerNode` is a JSON-RPC ledger served over real HTTP so the whole stack,
//! including `JsonRpcLedgerClient`, is exercised. `TestWallet` stands in for the
//! browser extension.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vault_ledger::config::VaultConfig;
use vault_ledger::ledger::{CallArg, LedgerTransaction};
use vault_ledger::wallet::{NetworkDetails, WalletError, WalletExtension, WalletResult};

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
const SIGNED_PREFIX: &str = "signed:";

#[derive(Default)]
pub struct NodeState {
    pub units: i128,
    pub sequence: u64,
    /// Withdraw simulations fail above this many base units.
    pub withdraw_limit: Option<i128>,
    /// Base units kept by the contract from each deposit.
    pub skim: i128,
    /// `getTransaction` answers NOT_FOUND this many times per transaction.
    pub pending_polls: u32,
    pub never_confirm: bool,
    pub fail_simulation: Option<String>,
    pub submitted: HashMap<String, LedgerTransaction>,
    pub polls: HashMap<String, u32>,
    pub methods: Vec<String>,
}

impl NodeState {
    pub fn count(&self, method: &str) -> usize {
        self.methods.iter().filter(|m| *m == method).count()
    }
}

/// Local JSON-RPC ledger node with a single vault contract.
pub struct LedgerNode {
    pub url: String,
    pub state: Arc<Mutex<NodeState>>,
}

impl LedgerNode {
    pub async fn start(units: i128) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(NodeState {
            units,
            sequence: 4_000,
            ..Default::default()
        }));

        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let state = shared.clone();
                        tokio::spawn(async move {
                            serve(socket, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { url, state }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn count(&self, method: &str) -> usize {
        self.with(|s| s.count(method))
    }
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<NodeState>>) {
    let Some(body) = read_body(&mut socket).await else {
        return;
    };
    let request: Value = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return,
    };

    let method = request["method"].as_str().unwrap_or_default().to_string();
    let result = {
        let mut state = state.lock().unwrap();
        state.methods.push(method.clone());
        dispatch(&mut state, &method, &request["params"])
    };
    let reply = json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }).to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.len(),
        reply
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn dispatch(state: &mut NodeState, method: &str, params: &Value) -> Value {
    match method {
        "getAccount" => json!({
            "id": params["address"],
            "sequence": state.sequence.to_string(),
        }),
        "simulateTransaction" => {
            let tx = LedgerTransaction::decode(params["transaction"].as_str().unwrap_or_default()).unwrap();
            simulate(state, &tx)
        }
        "sendTransaction" => {
            let envelope = params["transaction"].as_str().unwrap_or_default();
            let tx = LedgerTransaction::decode(envelope.strip_prefix(SIGNED_PREFIX).unwrap()).unwrap();
            let hash = format!("{:064x}", state.submitted.len() + 1);
            state.submitted.insert(hash.clone(), tx);
            state.sequence += 1;
            json!({ "status": "PENDING", "hash": hash })
        }
        "getTransaction" => {
            let hash = params["hash"].as_str().unwrap_or_default().to_string();
            let polls = state.polls.entry(hash.clone()).or_insert(0);
            *polls += 1;
            if state.never_confirm || *polls <= state.pending_polls {
                return json!({ "status": "NOT_FOUND" });
            }
            if *polls == state.pending_polls + 1 {
                apply(state, &hash);
            }
            json!({ "status": "SUCCESS", "ledger": 9_001 })
        }
        _ => Value::Null,
    }
}

fn simulate(state: &NodeState, tx: &LedgerTransaction) -> Value {
    if let Some(error) = &state.fail_simulation {
        return json!({ "error": error, "latestLedger": 9_000 });
    }
    let amount = tx.call.amount().unwrap_or_default();
    let retval = match tx.call.function.as_str() {
        "balance" => Some(CallArg::I128(state.units)),
        "withdraw" if state.withdraw_limit.is_some_and(|limit| amount > limit) => {
            return json!({ "error": "HostError: reserve cannot cover withdrawal", "latestLedger": 9_000 });
        }
        "withdraw" if amount > state.units => {
            return json!({ "error": "HostError: balance too low", "latestLedger": 9_000 });
        }
        _ => None,
    };
    json!({
        "results": [{ "retval": retval }],
        "minResourceFee": "2500",
        "transactionData": { "instructions": 1200, "readBytes": 64, "writeBytes": 32 },
        "latestLedger": 9_000,
    })
}

fn apply(state: &mut NodeState, hash: &str) {
    let Some(tx) = state.submitted.get(hash).cloned() else {
        return;
    };
    let amount = tx.call.amount().unwrap_or_default();
    match tx.call.function.as_str() {
        "deposit" => state.units += amount - state.skim,
        "withdraw" => state.units -= amount,
        _ => {}
    }
}

async fn read_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if buf.len() >= start + length {
                return Some(buf[start..start + length].to_vec());
            }
        }
    }
}

/// Live-mode config pointed at `node`, with short confirmation timings.
pub fn live_config(node: &LedgerNode) -> VaultConfig {
    let mut config = VaultConfig::default();
    config.vault.mock_mode = false;
    config.ledger.rpc_url = node.url.clone();
    config.ledger.contract_id = "CVAULT".to_string();
    config.ledger.reserve_id = "CRESERVE".to_string();
    config.ledger.rpc_timeout_secs = 5;
    config.transactions.poll_interval_ms = 50;
    config.transactions.confirmation_timeout_secs = 5;
    config
}

pub fn temp_state_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("vault-it-{}.json", uuid::Uuid::new_v4()))
}

struct WalletState {
    allowed: bool,
    address: Option<String>,
    network: (String, String),
    reject_signing: bool,
}

/// Connected wallet extension that signs by prefixing the payload.
pub struct TestWallet {
    state: Mutex<WalletState>,
    pub signed: Mutex<Vec<String>>,
}

impl TestWallet {
    pub fn connected(address: &str) -> Self {
        Self {
            state: Mutex::new(WalletState {
                allowed: true,
                address: Some(address.to_string()),
                network: ("TESTNET".to_string(), TESTNET_PASSPHRASE.to_string()),
                reject_signing: false,
            }),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn switch_account(&self, address: &str) {
        self.state.lock().unwrap().address = Some(address.to_string());
    }

    pub fn switch_network(&self, name: &str, passphrase: &str) {
        self.state.lock().unwrap().network = (name.to_string(), passphrase.to_string());
    }

    pub fn set_allowed(&self, allowed: bool) {
        self.state.lock().unwrap().allowed = allowed;
    }

    pub fn reject_signing(&self, reject: bool) {
        self.state.lock().unwrap().reject_signing = reject;
    }

    pub fn signatures(&self) -> usize {
        self.signed.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletExtension for TestWallet {
    async fn is_present(&self) -> WalletResult<bool> {
        Ok(true)
    }

    async fn is_allowed(&self) -> WalletResult<bool> {
        Ok(self.state.lock().unwrap().allowed)
    }

    async fn request_allowed(&self) -> WalletResult<bool> {
        self.state.lock().unwrap().allowed = true;
        Ok(true)
    }

    async fn request_access(&self) -> WalletResult<Option<String>> {
        let state = self.state.lock().unwrap();
        if !state.allowed {
            return Err(WalletError::Rejected("user denied access".to_string()));
        }
        Ok(state.address.clone())
    }

    async fn get_address(&self) -> WalletResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(if state.allowed { state.address.clone() } else { None })
    }

    async fn network_details(&self) -> WalletResult<NetworkDetails> {
        let state = self.state.lock().unwrap();
        Ok(NetworkDetails {
            network: state.network.0.clone(),
            network_passphrase: state.network.1.clone(),
            network_url: None,
            rpc_url: None,
        })
    }

    async fn sign_transaction(
        &self,
        payload: &str,
        _network_passphrase: &str,
        _address: &str,
    ) -> WalletResult<String> {
        if self.state.lock().unwrap().reject_signing {
            return Err(WalletError::Rejected("user declined".to_string()));
        }
        self.signed.lock().unwrap().push(payload.to_string());
        Ok(format!("{}{}", SIGNED_PREFIX, payload))
    }
}
