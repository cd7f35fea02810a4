use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use vault_ledger::config;
use vault_ledger::lifecycle::{build_runtime, VaultRuntime};
use vault_ledger::observability::logging;
use vault_ledger::VaultError;

#[derive(Parser)]
#[command(name = "vault-cli")]
#[command(about = "Read and move vault balances", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account to act for. Defaults to the wallet's active address.
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current balance and whether features are unlocked
    Balance,
    /// Deposit into the vault
    Deposit { amount: f64 },
    /// Withdraw from the vault
    Withdraw { amount: f64 },
    /// Show the unlock threshold
    MinBalance,
    /// Show the wallet session snapshot
    Wallet,
    /// Ask the wallet for permission and the active address
    Connect,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&config.observability);

    let runtime = match build_runtime(config) {
        Ok(runtime) => runtime,
        Err(e) => return report(Err(e)),
    };

    report(run(&runtime, cli.user.as_deref(), cli.command).await)
}

async fn run(runtime: &VaultRuntime, user: Option<&str>, command: Commands) -> Result<Value, VaultError> {
    let vault = &runtime.vault;
    match command {
        Commands::Balance => {
            let balance = vault.get_balance(user).await?;
            Ok(json!({
                "balance": balance,
                "min_balance": vault.minimum_required_balance(),
                "unlocked": vault.is_unlocked(balance),
                "mock": vault.is_mock(),
            }))
        }
        Commands::Deposit { amount } => Ok(serde_json::to_value(vault.deposit(amount, user).await?)
            .unwrap_or(Value::Null)),
        Commands::Withdraw { amount } => Ok(serde_json::to_value(vault.withdraw(amount, user).await?)
            .unwrap_or(Value::Null)),
        Commands::MinBalance => Ok(json!({ "min_balance": vault.minimum_required_balance() })),
        Commands::Wallet => {
            let snapshot = runtime.session.refresh().await;
            Ok(json!({
                "state": snapshot.state(),
                "wrong_network": runtime.session.wrong_network(),
                "expected_network": runtime.session.expected(),
                "snapshot": snapshot.as_ref(),
            }))
        }
        Commands::Connect => {
            let address = runtime.session.connect().await?;
            Ok(json!({
                "address": address,
                "state": runtime.session.state(),
                "wrong_network": runtime.session.wrong_network(),
            }))
        }
    }
}

fn report(result: Result<Value, VaultError>) -> ExitCode {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let body = json!({
                "error": e.code(),
                "message": e.to_string(),
                "outcome_unknown": e.is_outcome_unknown(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}
