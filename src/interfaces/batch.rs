use crate::application::ledger::Ledger;
use crate::error::Result;
use crate::interfaces::csv::command_reader::{CommandReader, LedgerCommand};
use std::io::Read;
use tracing::{debug, warn};

/// Outcome counts of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub failed: usize,
}

/// Applies a single command to the ledger.
pub async fn apply_command(ledger: &Ledger, command: LedgerCommand) -> Result<()> {
    match command {
        LedgerCommand::CreateUser { username } => {
            ledger.create_user(&username).await?;
        }
        LedgerCommand::CreateAccount {
            user_id,
            account_name,
            balance,
        } => {
            ledger.create_account(user_id, account_name, balance).await?;
        }
        LedgerCommand::Transfer {
            sender,
            receiver,
            amount,
        } => {
            ledger.transfer(sender, receiver, amount).await?;
        }
    }
    Ok(())
}

/// Applies every command in order.
///
/// Unreadable rows and rejected commands are logged and skipped; they never
/// stop the batch.
pub async fn run_batch<R: Read>(ledger: &Ledger, reader: CommandReader<R>) -> BatchSummary {
    let mut summary = BatchSummary::default();

    // Row 1 is the header.
    for (row, command) in reader.commands().enumerate().map(|(i, c)| (i + 2, c)) {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                warn!(row, error = %e, kind = %e.kind(), "Error reading command");
                summary.failed += 1;
                continue;
            }
        };

        debug!(row, ?command, "applying command");
        match apply_command(ledger, command).await {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                warn!(row, error = %e, kind = %e.kind(), "Error processing command");
                summary.failed += 1;
            }
        }
    }

    summary
}
