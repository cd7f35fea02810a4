//! Stub collaborators for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::{NetworkConfig, VaultConfig};
use crate::ledger::{
    AccountInfo, CallArg, LedgerRpc, LedgerTransaction, Prepared, ResourceFootprint, RpcError,
    RpcResult, SignedTransaction, Simulation, SimulationSuccess, Submission, TxStatus,
};
use crate::wallet::{NetworkDetails, NetworkIdentity, WalletError, WalletExtension, WalletResult};

pub const SIGNED_PREFIX: &str = "signed:";

pub fn testnet() -> NetworkIdentity {
    NetworkConfig::default().expected()
}

pub fn live_config() -> VaultConfig {
    let mut config = VaultConfig::default();
    config.vault.mock_mode = false;
    config.ledger.contract_id = "CVAULT".to_string();
    config.ledger.reserve_id = "CRESERVE".to_string();
    config
}

/// Serve one HTTP request with a fixed JSON body and return the base URL.
pub async fn serve_json_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn details(name: &str, passphrase: &str) -> NetworkDetails {
    NetworkDetails {
        network: name.to_string(),
        network_passphrase: passphrase.to_string(),
        network_url: None,
        rpc_url: None,
    }
}

struct WalletState {
    present: bool,
    allowed: bool,
    grant: bool,
    address: Option<String>,
    hide_silent: bool,
    network: Option<NetworkDetails>,
    fail_with: Option<WalletError>,
    sign_error: Option<WalletError>,
}

/// Scriptable wallet extension. Signs by prefixing the payload.
pub struct StubWallet {
    state: Mutex<WalletState>,
    calls: Mutex<Vec<&'static str>>,
}

impl StubWallet {
    pub fn connected(address: &str) -> Self {
        let expected = testnet();
        Self::with_state(WalletState {
            present: true,
            allowed: true,
            grant: true,
            address: Some(address.to_string()),
            hide_silent: false,
            network: Some(details(&expected.name, &expected.passphrase)),
            fail_with: None,
            sign_error: None,
        })
    }

    pub fn absent() -> Self {
        Self::with_state(WalletState {
            present: false,
            allowed: false,
            grant: false,
            address: None,
            hide_silent: false,
            network: None,
            fail_with: None,
            sign_error: None,
        })
    }

    fn with_state(state: WalletState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn set_address(&self, address: Option<&str>) {
        self.state.lock().unwrap().address = address.map(str::to_string);
    }

    pub fn set_allowed(&self, allowed: bool) {
        self.state.lock().unwrap().allowed = allowed;
    }

    pub fn set_grant(&self, grant: bool) {
        self.state.lock().unwrap().grant = grant;
    }

    pub fn hide_silent_address(&self, hide: bool) {
        self.state.lock().unwrap().hide_silent = hide;
    }

    pub fn set_network(&self, network: Option<(&str, &str)>) {
        self.state.lock().unwrap().network = network.map(|(name, passphrase)| details(name, passphrase));
    }

    pub fn fail_with(&self, error: Option<WalletError>) {
        self.state.lock().unwrap().fail_with = error;
    }

    pub fn set_sign_error(&self, error: Option<WalletError>) {
        self.state.lock().unwrap().sign_error = error;
    }

    fn enter(&self, method: &'static str) -> WalletResult<std::sync::MutexGuard<'_, WalletState>> {
        self.calls.lock().unwrap().push(method);
        let state = self.state.lock().unwrap();
        match &state.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl WalletExtension for StubWallet {
    async fn is_present(&self) -> WalletResult<bool> {
        Ok(self.enter("is_present")?.present)
    }

    async fn is_allowed(&self) -> WalletResult<bool> {
        let state = self.enter("is_allowed")?;
        if !state.present {
            return Err(WalletError::NotAvailable);
        }
        Ok(state.allowed)
    }

    async fn request_allowed(&self) -> WalletResult<bool> {
        let mut state = self.enter("request_allowed")?;
        if state.grant {
            state.allowed = true;
        }
        Ok(state.grant)
    }

    async fn request_access(&self) -> WalletResult<Option<String>> {
        let state = self.enter("request_access")?;
        if !state.allowed {
            return Err(WalletError::Rejected("user denied access".to_string()));
        }
        Ok(state.address.clone())
    }

    async fn get_address(&self) -> WalletResult<Option<String>> {
        let state = self.enter("get_address")?;
        if !state.allowed || state.hide_silent {
            return Ok(None);
        }
        Ok(state.address.clone())
    }

    async fn network_details(&self) -> WalletResult<NetworkDetails> {
        let state = self.enter("network_details")?;
        state.network.clone().ok_or(WalletError::NotAvailable)
    }

    async fn sign_transaction(
        &self,
        payload: &str,
        _network_passphrase: &str,
        _address: &str,
    ) -> WalletResult<String> {
        self.calls.lock().unwrap().push("sign_transaction");
        if let Some(error) = self.state.lock().unwrap().sign_error.clone() {
            return Err(error);
        }
        Ok(format!("{}{}", SIGNED_PREFIX, payload))
    }
}

#[derive(Default)]
struct LedgerState {
    units: i128,
    sequence: u64,
    withdraw_limit: Option<i128>,
    simulation_failure: Option<String>,
    simulation_transport_broken: bool,
    submit_rejection: Option<String>,
    statuses: VecDeque<RpcResult<TxStatus>>,
    pending_forever: bool,
    fee_skim: i128,
    fail_balance_after_confirm: bool,
    confirmed_any: bool,
    submitted: Vec<(String, LedgerTransaction)>,
    applied: HashSet<String>,
    simulated_sources: Vec<String>,
}

/// In-memory vault contract. Confirmed transactions change the balance.
pub struct StubLedger {
    state: Mutex<LedgerState>,
    calls: Mutex<Vec<&'static str>>,
}

impl StubLedger {
    pub fn new(units: i128) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                units,
                sequence: 100,
                ..Default::default()
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn units(&self) -> i128 {
        self.state.lock().unwrap().units
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Withdraw simulations fail above `limit` base units.
    pub fn set_withdraw_limit(&self, limit: Option<i128>) {
        self.state.lock().unwrap().withdraw_limit = limit;
    }

    pub fn fail_simulations(&self, diagnostic: Option<&str>) {
        self.state.lock().unwrap().simulation_failure = diagnostic.map(str::to_string);
    }

    pub fn break_simulation_transport(&self, broken: bool) {
        self.state.lock().unwrap().simulation_transport_broken = broken;
    }

    pub fn reject_submissions(&self, detail: Option<&str>) {
        self.state.lock().unwrap().submit_rejection = detail.map(str::to_string);
    }

    pub fn script_statuses(&self, statuses: Vec<RpcResult<TxStatus>>) {
        self.state.lock().unwrap().statuses = statuses.into();
    }

    pub fn set_pending_forever(&self, pending: bool) {
        self.state.lock().unwrap().pending_forever = pending;
    }

    /// Base units the contract keeps from every confirmed deposit.
    pub fn set_fee_skim(&self, units: i128) {
        self.state.lock().unwrap().fee_skim = units;
    }

    pub fn fail_balance_after_confirm(&self, fail: bool) {
        self.state.lock().unwrap().fail_balance_after_confirm = fail;
    }

    pub fn submitted_amounts(&self) -> Vec<i128> {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .filter_map(|(_, tx)| tx.call.amount())
            .collect()
    }

    pub fn simulated_sources(&self) -> Vec<String> {
        self.state.lock().unwrap().simulated_sources.clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }

    fn success(return_value: Option<CallArg>) -> SimulationSuccess {
        SimulationSuccess {
            return_value,
            min_resource_fee: 100,
            footprint: ResourceFootprint::default(),
            latest_ledger: 1_000,
        }
    }

    fn apply(state: &mut LedgerState, hash: &str) {
        if !state.applied.insert(hash.to_string()) {
            return;
        }
        let Some(tx) = state
            .submitted
            .iter()
            .find(|(h, _)| h == hash)
            .map(|(_, tx)| tx.clone())
        else {
            return;
        };
        let amount = tx.call.amount().unwrap_or_default();
        match tx.call.function.as_str() {
            "deposit" => state.units += amount - state.fee_skim,
            "withdraw" => state.units -= amount,
            _ => {}
        }
        state.confirmed_any = true;
    }
}

#[async_trait]
impl LedgerRpc for StubLedger {
    async fn account(&self, address: &str) -> RpcResult<AccountInfo> {
        self.record("account");
        Ok(AccountInfo {
            id: address.to_string(),
            sequence: self.state.lock().unwrap().sequence,
        })
    }

    async fn simulate(&self, tx: &LedgerTransaction) -> RpcResult<Simulation> {
        self.record("simulate");
        let mut state = self.state.lock().unwrap();
        state.simulated_sources.push(tx.source.clone());

        if state.simulation_transport_broken {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        if let Some(diagnostic) = &state.simulation_failure {
            return Ok(Simulation::Failure {
                diagnostic: diagnostic.clone(),
            });
        }

        let amount = tx.call.amount().unwrap_or_default();
        Ok(match tx.call.function.as_str() {
            "balance" if state.fail_balance_after_confirm && state.confirmed_any => {
                Simulation::Failure {
                    diagnostic: "ledger entry unavailable".to_string(),
                }
            }
            "balance" => Simulation::Success(Self::success(Some(CallArg::I128(state.units)))),
            "withdraw" if state.withdraw_limit.is_some_and(|limit| amount > limit) => {
                Simulation::Failure {
                    diagnostic: "HostError: reserve cannot cover withdrawal".to_string(),
                }
            }
            "withdraw" if amount > state.units => Simulation::Failure {
                diagnostic: "HostError: balance too low".to_string(),
            },
            _ => Simulation::Success(Self::success(None)),
        })
    }

    async fn prepare(&self, tx: &LedgerTransaction) -> RpcResult<Prepared> {
        self.record("prepare");
        Ok(Prepared::Ready(tx.assemble(&Self::success(None))))
    }

    async fn submit(&self, signed: &SignedTransaction) -> RpcResult<Submission> {
        self.record("submit");
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = &state.submit_rejection {
            return Ok(Submission::Rejected {
                hash: None,
                detail: detail.clone(),
            });
        }
        let payload = signed
            .envelope
            .strip_prefix(SIGNED_PREFIX)
            .ok_or_else(|| RpcError::Malformed("unsigned envelope".to_string()))?;
        let tx = LedgerTransaction::decode(payload).map_err(|e| RpcError::Malformed(e.to_string()))?;
        let hash = format!("tx{:04}", state.submitted.len() + 1);
        state.submitted.push((hash.clone(), tx));
        state.sequence += 1;
        Ok(Submission::Accepted { hash })
    }

    async fn status(&self, hash: &str) -> RpcResult<TxStatus> {
        self.record("status");
        let mut state = self.state.lock().unwrap();
        if state.pending_forever {
            return Ok(TxStatus::Pending);
        }
        match state.statuses.pop_front() {
            Some(Ok(TxStatus::Success {
                ledger,
                return_value,
            })) => {
                Self::apply(&mut state, hash);
                Ok(TxStatus::Success {
                    ledger,
                    return_value,
                })
            }
            Some(scripted) => scripted,
            None => {
                Self::apply(&mut state, hash);
                Ok(TxStatus::Success {
                    ledger: 1_001,
                    return_value: None,
                })
            }
        }
    }
}
