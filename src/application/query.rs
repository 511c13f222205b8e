use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transfer::{AccountStatement, HistoryEntry, TransferRecord};
use crate::error::{LedgerError, Result};

/// Read-only balance and history lookups.
///
/// Queries never take the transfer engine's lock; the stores guarantee they
/// observe either all or none of a transfer.
#[derive(Clone)]
pub struct QueryService {
    store: LedgerStoreRef,
}

impl QueryService {
    pub fn new(store: LedgerStoreRef) -> Self {
        Self { store }
    }

    pub async fn balance_of(&self, account_id: AccountId) -> Result<Balance> {
        self.store
            .read_balance(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Transfers sent or received by the account, ascending by transfer id.
    ///
    /// An existing account without transfers yields an empty list.
    pub async fn history_of(&self, account_id: AccountId) -> Result<Vec<TransferRecord>> {
        if self.store.read_balance(account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        let mut transfers = self.store.history(account_id).await?;
        transfers.sort_by_key(|t| t.transfer_id);
        Ok(transfers)
    }

    /// [`history_of`](Self::history_of) seen from the account's side.
    pub async fn statement_of(&self, account_id: AccountId) -> Result<AccountStatement> {
        let transfers = self
            .history_of(account_id)
            .await?
            .iter()
            .map(|record| HistoryEntry::for_account(record, account_id))
            .collect();
        Ok(AccountStatement {
            account_id,
            transfers,
        })
    }
}
