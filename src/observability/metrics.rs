//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vault_transactions_total` (counter): ledger mutations by operation, outcome
//! - `vault_confirmation_seconds` (histogram): submit-to-terminal latency
//! - `vault_simulations_total` (counter): simulations by operation, result
//! - `vault_withdraw_reductions_total` (counter): withdrawals sent with a reduced amount
//! - `vault_cache_lookups_total` (counter): cache reads by result (hit, stale, miss)
//! - `vault_cache_entries` (gauge): cached accounts
//! - `wallet_refresh_total` (counter): session refreshes by outcome
//! - `vault_mock_operations_total` (counter): mock store mutations by operation, outcome
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transaction(operation: &'static str, outcome: &'static str) {
    counter!("vault_transactions_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

pub fn record_confirmation_latency(operation: &'static str, elapsed: Duration) {
    histogram!("vault_confirmation_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn record_simulation(operation: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("vault_simulations_total", "operation" => operation, "result" => result)
        .increment(1);
}

pub fn record_withdraw_reduction() {
    counter!("vault_withdraw_reductions_total").increment(1);
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("vault_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("vault_cache_entries").set(size as f64);
}

pub fn record_wallet_refresh(outcome: &'static str) {
    counter!("wallet_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_mock_operation(operation: &'static str, outcome: &'static str) {
    counter!("vault_mock_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}
