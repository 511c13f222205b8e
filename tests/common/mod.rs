#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use transfer_ledger::application::ledger::Ledger;
use transfer_ledger::domain::account::{
    Account, AccountId, Balance, NewAccount, User, UserAccounts,
};
use transfer_ledger::domain::ports::{
    AccountRegistry, BalanceStore, LedgerStore, LedgerStoreRef, TransferLedger, UnitOfWork,
};
use transfer_ledger::domain::transfer::{NewTransfer, TransferId, TransferRecord};
use transfer_ledger::error::{LedgerError, Result};
use transfer_ledger::infrastructure::in_memory::InMemoryLedgerStore;

pub const BATCH_HEADER: &str = "type, user, name, sender, receiver, amount";

/// A ledger over `store` with one user owning one account per balance, ids 1..=n.
pub async fn seed(store: LedgerStoreRef, balances: &[i64]) -> Arc<Ledger> {
    let ledger = Ledger::new(store);
    let user = ledger.create_user("alice").await.unwrap();
    for balance in balances {
        ledger
            .create_account(user.user_id, None, *balance)
            .await
            .unwrap();
    }
    Arc::new(ledger)
}

pub async fn seeded_ledger(balances: &[i64]) -> Arc<Ledger> {
    seed(Arc::new(InMemoryLedgerStore::new()), balances).await
}

pub async fn balance(ledger: &Ledger, account: u64) -> i64 {
    ledger.balance_of(AccountId(account)).await.unwrap().value()
}

pub async fn total(ledger: &Ledger) -> i64 {
    ledger
        .list_accounts()
        .await
        .unwrap()
        .iter()
        .map(|a| a.balance.value())
        .sum()
}

/// Writes a batch CSV (header included) to a temporary file.
pub fn batch_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", BATCH_HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

/// Failure injected into every unit of work of a [`FaultyStore`].
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    FailAppend,
    FailCommit,
    /// Sleeps before every balance read.
    Stall(Duration),
}

/// An in-memory store whose transfers misbehave in a chosen way.
#[derive(Clone)]
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            fault,
        }
    }
}

#[async_trait]
impl BalanceStore for FaultyStore {
    async fn read_balance(&self, account_id: AccountId) -> Result<Option<Balance>> {
        self.inner.read_balance(account_id).await
    }
}

#[async_trait]
impl TransferLedger for FaultyStore {
    async fn history(&self, account_id: AccountId) -> Result<Vec<TransferRecord>> {
        self.inner.history(account_id).await
    }

    async fn last_transfer_id(&self) -> Result<Option<TransferId>> {
        self.inner.last_transfer_id().await
    }
}

#[async_trait]
impl AccountRegistry for FaultyStore {
    async fn create_user(&self, username: String) -> Result<User> {
        self.inner.create_user(username).await
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        self.inner.create_account(account).await
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.inner.get_account(account_id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn list_users(&self) -> Result<Vec<UserAccounts>> {
        self.inner.list_users().await
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(FaultyUnitOfWork {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }
}

struct FaultyUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn read_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>> {
        if let Fault::Stall(delay) = self.fault {
            tokio::time::sleep(delay).await;
        }
        self.inner.read_balance(account_id).await
    }

    async fn write_balance(&mut self, account_id: AccountId, balance: Balance) -> Result<()> {
        self.inner.write_balance(account_id, balance).await
    }

    async fn append(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        if let Fault::FailAppend = self.fault {
            return Err(LedgerError::internal("injected append failure"));
        }
        self.inner.append(transfer).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if let Fault::FailCommit = self.fault {
            return Err(LedgerError::internal("injected commit failure"));
        }
        self.inner.commit().await
    }
}
