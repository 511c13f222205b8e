use crate::domain::ports::LedgerStoreRef;
use crate::domain::transfer::{NewTransfer, TransferOrder, TransferRecord};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Moves value between two accounts.
///
/// `TransferEngine` is the only writer of balances and the only appender to
/// the ledger. Every transfer runs as one unit of work while holding an
/// engine-wide lock, so two transfers never interleave their reads and writes.
/// A failed transfer drops its unit of work uncommitted and leaves no trace.
pub struct TransferEngine {
    store: LedgerStoreRef,
    gate: Mutex<()>,
    timeout: Option<Duration>,
}

impl TransferEngine {
    pub fn new(store: LedgerStoreRef) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
            timeout: None,
        }
    }

    /// Abandons (and rolls back) any transfer whose unit of work takes longer
    /// than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Executes a validated transfer and returns the committed ledger record.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` naming the missing sender or receiver.
    /// * `InsufficientFunds` when the sender balance would go negative.
    /// * `TimedOut`, `SequenceConflict` or a storage error otherwise.
    ///
    /// In every error case no balance and no ledger entry has changed.
    pub async fn transfer(&self, order: TransferOrder) -> Result<TransferRecord> {
        let _exclusive = self.gate.lock().await;

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.apply(order))
                .await
                .unwrap_or(Err(LedgerError::TimedOut(limit))),
            None => self.apply(order).await,
        };

        match &outcome {
            Ok(record) => info!(
                transfer_id = %record.transfer_id,
                sender = %record.sender_id,
                receiver = %record.receiver_id,
                amount = %record.transfer_amount,
                "transfer committed"
            ),
            Err(e) => warn!(
                sender = %order.sender(),
                receiver = %order.receiver(),
                amount = %order.amount(),
                error = %e,
                "transfer rolled back"
            ),
        }
        outcome
    }

    async fn apply(&self, order: TransferOrder) -> Result<TransferRecord> {
        let (sender, receiver, amount) = (order.sender(), order.receiver(), order.amount());
        let mut work = self.store.begin().await?;

        let sender_balance = work
            .read_balance(sender)
            .await?
            .ok_or(LedgerError::AccountNotFound(sender))?;
        let receiver_balance = work
            .read_balance(receiver)
            .await?
            .ok_or(LedgerError::AccountNotFound(receiver))?;

        let sender_new =
            sender_balance
                .withdraw(amount)
                .ok_or(LedgerError::InsufficientFunds {
                    account: sender,
                    balance: sender_balance,
                    requested: amount,
                })?;
        let receiver_new = receiver_balance
            .deposit(amount)
            .ok_or(LedgerError::BalanceOverflow(receiver))?;

        work.write_balance(sender, sender_new).await?;
        work.write_balance(receiver, receiver_new).await?;

        let record = work
            .append(NewTransfer {
                sender_id: sender,
                receiver_id: receiver,
                transfer_amount: amount,
                sender_resulting_balance: sender_new,
                receiver_resulting_balance: receiver_new,
                transfer_time: Utc::now(),
            })
            .await?;

        debug!(transfer_id = %record.transfer_id, "committing transfer");
        work.commit().await?;
        Ok(record)
    }
}
