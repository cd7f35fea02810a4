//! Builds, simulates, signs, submits and confirms vault contract calls.
//!
//! # Responsibilities
//! - Validate amounts before any wallet or network I/O
//! - Read balances by simulation only
//! - Search downward for a feasible withdraw amount
//! - Never resubmit after a confirmation timeout

use std::sync::Arc;

use uuid::Uuid;

use crate::amount::{positive_fixed, FixedPoint, Precision};
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::ledger::{
    CallArg, ContractCall, LedgerRpc, LedgerTransaction, Prepared, SignedTransaction, Simulation,
    Submission, VaultOperation,
};
use crate::observability::metrics;
use crate::transaction::attempt::{AttemptStage, TransactionAttempt};
use crate::transaction::confirmation::ConfirmationPoller;
use crate::wallet::extension::signing_error;
use crate::wallet::{resolve_address, NetworkIdentity, WalletExtension};

/// Result of a confirmed deposit or withdraw.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub attempt_id: Uuid,
    pub operation: VaultOperation,
    /// Account that signed.
    pub source: String,
    pub requested: FixedPoint,
    /// Amount actually sent; below `requested` when a withdraw was reduced.
    pub applied: FixedPoint,
    pub tx_hash: String,
    pub ledger: u64,
}

impl TransactionOutcome {
    pub fn was_reduced(&self) -> bool {
        self.applied != self.requested
    }
}

#[derive(Debug, Clone)]
struct EngineSettings {
    contract_id: String,
    reserve_id: String,
    precision: Precision,
    expected_network: NetworkIdentity,
    base_fee: u64,
    tx_timeout_secs: u64,
    withdraw_max_decrements: u32,
}

pub struct TransactionEngine {
    ledger: Arc<dyn LedgerRpc>,
    wallet: Arc<dyn WalletExtension>,
    settings: EngineSettings,
    poller: ConfirmationPoller,
}

impl TransactionEngine {
    pub fn new(
        ledger: Arc<dyn LedgerRpc>,
        wallet: Arc<dyn WalletExtension>,
        config: &VaultConfig,
    ) -> VaultResult<Self> {
        let precision = config.asset.precision()?;
        Ok(Self {
            ledger,
            wallet,
            settings: EngineSettings {
                contract_id: config.ledger.contract_id.clone(),
                reserve_id: config.ledger.reserve_id.clone(),
                precision,
                expected_network: config.network.expected(),
                base_fee: config.ledger.base_fee,
                tx_timeout_secs: config.transactions.tx_timeout_secs,
                withdraw_max_decrements: config.transactions.withdraw_max_decrements,
            },
            poller: ConfirmationPoller::from_config(&config.transactions),
        })
    }

    pub fn precision(&self) -> Precision {
        self.settings.precision
    }

    /// Vault balance of `account` (or the wallet's address), read by simulation.
    pub async fn fetch_balance(&self, account: Option<&str>) -> VaultResult<FixedPoint> {
        let source = self.source_account(account).await?;
        self.check_network(false).await?;

        let tx = self.build(&source, VaultOperation::Balance, None).await?;
        match self.simulate(VaultOperation::Balance, &tx).await? {
            Simulation::Success(success) => {
                decode_balance(success.return_value, self.settings.precision)
            }
            Simulation::Failure { diagnostic } => Err(VaultError::SimulationFailed(diagnostic)),
        }
    }

    pub async fn deposit(&self, amount: f64, account: Option<&str>) -> VaultResult<TransactionOutcome> {
        let requested = positive_fixed(amount, self.settings.precision)?;
        let mut attempt = TransactionAttempt::new(VaultOperation::Deposit, requested);
        let result = self.run_deposit(&mut attempt, account).await;
        self.finish(&mut attempt, result)
    }

    /// Withdraw `amount`, reducing it one base unit at a time (up to the
    /// configured number of decrements) until simulation succeeds.
    pub async fn withdraw(&self, amount: f64, account: Option<&str>) -> VaultResult<TransactionOutcome> {
        let requested = positive_fixed(amount, self.settings.precision)?;
        let mut attempt = TransactionAttempt::new(VaultOperation::Withdraw, requested);
        let result = self.run_withdraw(&mut attempt, account).await;
        self.finish(&mut attempt, result)
    }

    async fn run_deposit(
        &self,
        attempt: &mut TransactionAttempt,
        account: Option<&str>,
    ) -> VaultResult<TransactionOutcome> {
        let source = self.source_account(account).await?;
        self.check_network(true).await?;

        let tx = self
            .build(&source, VaultOperation::Deposit, Some(attempt.amount()))
            .await?;
        match self.simulate(VaultOperation::Deposit, &tx).await? {
            Simulation::Success(_) => {}
            Simulation::Failure { diagnostic } => return Err(VaultError::SimulationFailed(diagnostic)),
        }
        attempt.advance(AttemptStage::Simulated);

        self.submit_and_confirm(attempt, tx).await
    }

    async fn run_withdraw(
        &self,
        attempt: &mut TransactionAttempt,
        account: Option<&str>,
    ) -> VaultResult<TransactionOutcome> {
        let source = self.source_account(account).await?;
        self.check_network(true).await?;

        let sequence = self.next_sequence(&source).await?;
        let requested = attempt.requested();
        let mut candidate = requested;
        let mut simulations = 0u32;

        let tx = loop {
            let tx = self.transaction(&source, sequence, VaultOperation::Withdraw, Some(candidate))?;
            simulations += 1;

            let simulation = self.simulate(VaultOperation::Withdraw, &tx).await?;
            let diagnostic = match simulation {
                Simulation::Success(_) => break tx,
                Simulation::Failure { diagnostic } => diagnostic,
            };

            let infeasible = || VaultError::WithdrawInfeasible {
                requested: requested.to_string(),
                attempts: simulations,
                detail: diagnostic.clone(),
            };
            if simulations > self.settings.withdraw_max_decrements {
                return Err(infeasible());
            }
            candidate = match candidate.decrement_unit() {
                Some(next) if !next.is_zero() => next,
                _ => return Err(infeasible()),
            };
            tracing::debug!(
                attempt_id = %attempt.id(),
                candidate = %candidate,
                diagnostic = %diagnostic,
                "Withdraw simulation failed, trying one unit less"
            );
        };

        if candidate != requested {
            metrics::record_withdraw_reduction();
            tracing::warn!(
                attempt_id = %attempt.id(),
                requested = %requested,
                applied = %candidate,
                "Withdraw amount reduced to a feasible value"
            );
        }
        attempt.reduce_to(candidate);
        attempt.advance(AttemptStage::Simulated);

        self.submit_and_confirm(attempt, tx).await
    }

    async fn submit_and_confirm(
        &self,
        attempt: &mut TransactionAttempt,
        tx: LedgerTransaction,
    ) -> VaultResult<TransactionOutcome> {
        let operation = attempt.operation();

        let prepared = match self
            .ledger
            .prepare(&tx)
            .await
            .map_err(|e| VaultError::SimulationFailed(e.to_string()))?
        {
            Prepared::Ready(prepared) => prepared,
            Prepared::Failed { diagnostic } => return Err(VaultError::SimulationFailed(diagnostic)),
        };
        attempt.advance(AttemptStage::Prepared);

        let payload = prepared
            .encode()
            .map_err(|e| VaultError::SubmissionFailed(format!("could not encode transaction: {}", e)))?;
        let envelope = self
            .wallet
            .sign_transaction(&payload, &self.settings.expected_network.passphrase, &prepared.source)
            .await
            .map_err(signing_error)?;
        attempt.advance(AttemptStage::Signed);

        let hash = match self
            .ledger
            .submit(&SignedTransaction { envelope })
            .await
            .map_err(|e| VaultError::SubmissionFailed(e.to_string()))?
        {
            Submission::Accepted { hash } => hash,
            Submission::Rejected { detail, .. } => return Err(VaultError::SubmissionFailed(detail)),
        };
        attempt.record_submission(&hash);
        tracing::info!(
            attempt_id = %attempt.id(),
            operation = %operation,
            tx_hash = %hash,
            "Transaction submitted"
        );

        let confirmation = self.poller.wait(self.ledger.as_ref(), &hash).await?;
        attempt.advance(AttemptStage::Confirmed);
        metrics::record_confirmation_latency(operation.as_str(), attempt.elapsed());

        Ok(TransactionOutcome {
            attempt_id: attempt.id(),
            operation,
            source: prepared.source,
            requested: attempt.requested(),
            applied: attempt.amount(),
            tx_hash: confirmation.tx_hash,
            ledger: confirmation.ledger,
        })
    }

    fn finish(
        &self,
        attempt: &mut TransactionAttempt,
        result: VaultResult<TransactionOutcome>,
    ) -> VaultResult<TransactionOutcome> {
        let operation = attempt.operation().as_str();
        match &result {
            Ok(outcome) => {
                metrics::record_transaction(operation, "confirmed");
                tracing::info!(
                    attempt_id = %outcome.attempt_id,
                    operation,
                    tx_hash = %outcome.tx_hash,
                    ledger = outcome.ledger,
                    applied = %outcome.applied,
                    "Transaction confirmed"
                );
            }
            Err(e) => {
                attempt.fail(e);
                metrics::record_transaction(operation, e.code());
                tracing::warn!(
                    attempt_id = %attempt.id(),
                    operation,
                    stage = %attempt.stage(),
                    tx_hash = attempt.tx_hash().unwrap_or("-"),
                    error = %e,
                    "Transaction attempt ended without confirmation"
                );
            }
        }
        result
    }

    /// Explicit account, else the wallet's address.
    pub async fn source_account(&self, account: Option<&str>) -> VaultResult<String> {
        match account {
            Some(address) if !address.is_empty() => Ok(address.to_string()),
            _ => resolve_address(self.wallet.as_ref()).await,
        }
    }

    /// Mutations refuse a wallet on the wrong network; reads only warn. A
    /// wallet that cannot report its network is not treated as wrong.
    async fn check_network(&self, mutation: bool) -> VaultResult<()> {
        let details = match self.wallet.network_details().await {
            Ok(details) => details,
            Err(e) => {
                tracing::debug!(error = %e, "Wallet network unknown, continuing");
                return Ok(());
            }
        };
        if self.settings.expected_network.matches(&details) {
            return Ok(());
        }

        let mismatch = VaultError::WrongNetwork {
            expected: self.settings.expected_network.name.clone(),
            actual: details.network,
        };
        if mutation {
            Err(mismatch)
        } else {
            tracing::warn!(error = %mismatch, "Reading balance while wallet is on another network");
            Ok(())
        }
    }

    async fn next_sequence(&self, source: &str) -> VaultResult<u64> {
        let account = self.ledger.account(source).await?;
        Ok(account.sequence.saturating_add(1))
    }

    async fn build(
        &self,
        source: &str,
        operation: VaultOperation,
        amount: Option<FixedPoint>,
    ) -> VaultResult<LedgerTransaction> {
        let sequence = self.next_sequence(source).await?;
        self.transaction(source, sequence, operation, amount)
    }

    fn transaction(
        &self,
        source: &str,
        sequence: u64,
        operation: VaultOperation,
        amount: Option<FixedPoint>,
    ) -> VaultResult<LedgerTransaction> {
        let units = amount.map(|a| a.to_i128()).transpose()?;
        Ok(LedgerTransaction {
            source: source.to_string(),
            sequence,
            fee: self.settings.base_fee,
            network_passphrase: self.settings.expected_network.passphrase.clone(),
            timeout_secs: self.settings.tx_timeout_secs,
            call: ContractCall::vault(
                &self.settings.contract_id,
                operation,
                source,
                &self.settings.reserve_id,
                units,
            ),
            resources: None,
        })
    }

    async fn simulate(
        &self,
        operation: VaultOperation,
        tx: &LedgerTransaction,
    ) -> VaultResult<Simulation> {
        let simulation = self
            .ledger
            .simulate(tx)
            .await
            .map_err(|e| VaultError::SimulationFailed(e.to_string()))?;
        let success = matches!(simulation, Simulation::Success(_));
        metrics::record_simulation(operation.as_str(), success);
        Ok(simulation)
    }
}

fn decode_balance(value: Option<CallArg>, precision: Precision) -> VaultResult<FixedPoint> {
    match value {
        Some(CallArg::I128(units)) => Ok(FixedPoint::from_i128(units, precision)),
        Some(other) => Err(VaultError::SimulationFailed(format!(
            "balance returned {:?}, expected i128",
            other
        ))),
        None => Err(VaultError::SimulationFailed(
            "balance returned no value".to_string(),
        )),
    }
}
