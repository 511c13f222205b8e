use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use transfer_ledger::application::ledger::Ledger;
use transfer_ledger::config::AppConfig;
use transfer_ledger::domain::account::{AccountId, UserId};
use transfer_ledger::domain::ports::LedgerStoreRef;
use transfer_ledger::error::{ErrorKind, LedgerError};
use transfer_ledger::infrastructure::in_memory::InMemoryLedgerStore;
#[cfg(feature = "storage-rocksdb")]
use transfer_ledger::infrastructure::rocksdb::RocksDBStore;
use transfer_ledger::interfaces::batch::run_batch;
use transfer_ledger::interfaces::csv::account_writer::AccountWriter;
use transfer_ledger::interfaces::csv::command_reader::CommandReader;
use transfer_ledger::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "LEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log filter, e.g. `info` or `transfer_ledger=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Roll back transfers that take longer than this many milliseconds
    #[arg(long)]
    transfer_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or list users
    #[command(subcommand)]
    User(UserCommand),
    /// Create or list accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Move funds from one account to another
    Transfer {
        sender: u64,
        receiver: u64,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Show the balance of an account
    Balance { account: u64 },
    /// Show the transfer history of an account
    History { account: u64 },
    /// Apply a CSV file of commands and print the resulting accounts
    Batch { input: PathBuf },
}

#[derive(Subcommand)]
enum UserCommand {
    Create { username: String },
    List,
}

#[derive(Subcommand)]
enum AccountCommand {
    Create {
        #[arg(long)]
        user_id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        balance: i64,
    },
    List,
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path).into_diagnostic()?,
            None => AppConfig::default(),
        };
        if let Some(db_path) = &self.db_path {
            config.db_path = Some(db_path.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.log_json {
            config.log_json = true;
        }
        if let Some(timeout) = self.transfer_timeout_ms {
            config.transfer_timeout_ms = Some(timeout);
        }
        Ok(config)
    }
}

fn open_store(config: &AppConfig) -> Result<LedgerStoreRef> {
    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        ErrorKind::Unprocessable => 5,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LedgerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct BalanceView {
    account_id: AccountId,
    balance: i64,
}

async fn run(ledger: &Ledger, command: Command) -> Result<(), LedgerError> {
    match command {
        Command::User(UserCommand::Create { username }) => {
            print_json(&ledger.create_user(&username).await?)
        }
        Command::User(UserCommand::List) => print_json(&ledger.list_users().await?),
        Command::Account(AccountCommand::Create {
            user_id,
            name,
            balance,
        }) => print_json(
            &ledger
                .create_account(UserId(user_id), name, balance)
                .await?,
        ),
        Command::Account(AccountCommand::List) => {
            let accounts = ledger.list_accounts().await?;
            AccountWriter::new(io::stdout().lock()).write_accounts(accounts)
        }
        Command::Transfer {
            sender,
            receiver,
            amount,
        } => print_json(
            &ledger
                .transfer(AccountId(sender), AccountId(receiver), amount)
                .await?,
        ),
        Command::Balance { account } => {
            let account_id = AccountId(account);
            let balance = ledger.balance_of(account_id).await?;
            print_json(&BalanceView {
                account_id,
                balance: balance.value(),
            })
        }
        Command::History { account } => {
            print_json(&ledger.statement_of(AccountId(account)).await?)
        }
        Command::Batch { input } => {
            let file = File::open(input)?;
            let summary = run_batch(ledger, CommandReader::new(file)).await;
            info!(
                applied = summary.applied,
                failed = summary.failed,
                "batch finished"
            );

            let accounts = ledger.list_accounts().await?;
            AccountWriter::new(io::stdout().lock()).write_accounts(accounts)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(&config);

    let store = open_store(&config)?;
    let mut ledger = Ledger::new(store);
    if let Some(timeout) = config.transfer_timeout() {
        ledger = ledger.with_transfer_timeout(timeout);
    }

    if let Err(e) = run(&ledger, cli.command).await {
        eprintln!("Error ({}): {}", e.kind(), e);
        std::process::exit(exit_code(e.kind()));
    }

    Ok(())
}
