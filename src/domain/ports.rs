use super::account::{Account, AccountId, Balance, NewAccount, User, UserAccounts};
use super::transfer::{NewTransfer, TransferId, TransferRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Point reads of committed account balances.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Returns `None` when the account does not exist.
    async fn read_balance(&self, account_id: AccountId) -> Result<Option<Balance>>;
}

/// Read side of the append-only transfer log.
#[async_trait]
pub trait TransferLedger: Send + Sync {
    /// Committed transfers where `account_id` is sender or receiver, ascending by id.
    async fn history(&self, account_id: AccountId) -> Result<Vec<TransferRecord>>;
    async fn last_transfer_id(&self) -> Result<Option<TransferId>>;
}

/// Users and accounts.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    async fn create_user(&self, username: String) -> Result<User>;
    /// Fails with `UserNotFound` or `DuplicateAccountName`; a missing name is
    /// replaced by [`Account::default_name`].
    async fn create_account(&self, account: NewAccount) -> Result<Account>;
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>>;
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    async fn list_users(&self) -> Result<Vec<UserAccounts>>;
}

/// One atomic unit of work over balances and the ledger.
///
/// Writes and appends are staged and only become visible on [`commit`],
/// all at once. Dropping a unit of work without committing it discards
/// everything it staged.
///
/// [`commit`]: UnitOfWork::commit
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads a balance, seeing this unit's own staged writes first.
    async fn read_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>>;
    async fn write_balance(&mut self, account_id: AccountId, balance: Balance) -> Result<()>;
    /// Stages a ledger append and returns the record with its assigned id.
    async fn append(&mut self, transfer: NewTransfer) -> Result<TransferRecord>;
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// A storage backend able to run transfers atomically.
#[async_trait]
pub trait LedgerStore: BalanceStore + TransferLedger + AccountRegistry {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
