//! Contract call and transaction types exchanged with the ledger RPC.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Single contract argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    Address(String),
    /// Signed 128-bit integer, carried as a decimal string on the wire.
    I128(#[serde(with = "i128_string")] i128),
    Symbol(String),
    Void,
}

mod i128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Vault contract entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultOperation {
    Balance,
    Deposit,
    Withdraw,
}

impl VaultOperation {
    /// Contract function name.
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultOperation::Balance => "balance",
            VaultOperation::Deposit => "deposit",
            VaultOperation::Withdraw => "withdraw",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, VaultOperation::Balance)
    }
}

impl fmt::Display for VaultOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract_id: String,
    pub function: String,
    pub args: Vec<CallArg>,
}

impl ContractCall {
    /// Vault call with the argument order `(user, reserve[, amount])`.
    pub fn vault(
        contract_id: &str,
        operation: VaultOperation,
        user: &str,
        reserve_id: &str,
        amount: Option<i128>,
    ) -> Self {
        let mut args = vec![
            CallArg::Address(user.to_string()),
            CallArg::Address(reserve_id.to_string()),
        ];
        if let Some(amount) = amount {
            args.push(CallArg::I128(amount));
        }
        Self {
            contract_id: contract_id.to_string(),
            function: operation.as_str().to_string(),
            args,
        }
    }

    pub fn amount(&self) -> Option<i128> {
        self.args.iter().rev().find_map(|arg| match arg {
            CallArg::I128(value) => Some(*value),
            _ => None,
        })
    }
}

/// Storage and compute budget returned by simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFootprint {
    #[serde(default)]
    pub instructions: u64,
    #[serde(default)]
    pub read_bytes: u64,
    #[serde(default)]
    pub write_bytes: u64,
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub read_write: Vec<String>,
}

/// Unsigned transaction invoking one contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub source: String,
    pub sequence: u64,
    /// Total fee in stroops; grows by the resource fee on assembly.
    pub fee: u64,
    pub network_passphrase: String,
    pub timeout_secs: u64,
    pub call: ContractCall,
    #[serde(default)]
    pub resources: Option<ResourceFootprint>,
}

impl LedgerTransaction {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Apply a successful simulation's footprint and resource fee.
    pub fn assemble(&self, simulation: &SimulationSuccess) -> Self {
        let mut assembled = self.clone();
        assembled.fee = self.fee.saturating_add(simulation.min_resource_fee);
        assembled.resources = Some(simulation.footprint.clone());
        assembled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: String,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSuccess {
    pub return_value: Option<CallArg>,
    pub min_resource_fee: u64,
    pub footprint: ResourceFootprint,
    pub latest_ledger: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simulation {
    Success(SimulationSuccess),
    Failure { diagnostic: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Ready(LedgerTransaction),
    Failed { diagnostic: String },
}

/// Wallet-signed envelope, opaque to this layer.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub envelope: String,
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("envelope", &format_args!("<{} bytes>", self.envelope.len()))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Accepted { hash: String },
    Rejected { hash: Option<String>, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Success {
        ledger: u64,
        return_value: Option<CallArg>,
    },
    Failed {
        ledger: Option<u64>,
        detail: String,
    },
}
