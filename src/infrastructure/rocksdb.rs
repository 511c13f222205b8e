use crate::domain::account::{
    Account, AccountId, Balance, NewAccount, User, UserAccounts, UserId,
};
use crate::domain::ports::{AccountRegistry, BalanceStore, LedgerStore, TransferLedger, UnitOfWork};
use crate::domain::transfer::{NewTransfer, TransferId, TransferRecord};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Column Family for users, keyed by user id.
pub const CF_USERS: &str = "users";
/// Column Family for accounts, keyed by account id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Index of accounts per user, keyed by `(user id, account id)`.
pub const CF_USER_ACCOUNTS: &str = "user_accounts";
/// Column Family for the transfer ledger, keyed by transfer id.
pub const CF_TRANSFERS: &str = "transfers";
/// Index of transfers per account, keyed by `(account id, transfer id)`.
pub const CF_ACCOUNT_TRANSFERS: &str = "account_transfers";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_USERS,
    CF_ACCOUNTS,
    CF_USER_ACCOUNTS,
    CF_TRANSFERS,
    CF_ACCOUNT_TRANSFERS,
];

fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn pair_key(owner: u64, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&owner.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::internal(format!("Malformed key of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_values<T, I>(items: I) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    I: Iterator<Item = std::result::Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>>,
{
    let mut values = Vec::new();
    for item in items {
        let (_key, value) = item?;
        values.push(serde_json::from_slice(&value)?);
    }
    Ok(values)
}

/// A persistent ledger backed by RocksDB.
///
/// Keys are big-endian ids so iteration order is id order. Values are JSON.
/// A unit of work is committed as a single `WriteBatch`, which RocksDB applies
/// atomically across column families.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    registry: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), descriptors)?;
        info!(path = %path.as_ref().display(), "opened rocksdb ledger store");

        Ok(Self {
            db: Arc::new(db),
            registry: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::internal(format!("Column family '{}' not found", name)))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn values<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        decode_values(self.db.iterator_cf(cf, IteratorMode::Start))
    }

    /// Highest id stored in a column family keyed by [`id_key`].
    fn last_id(&self, cf_name: &str) -> Result<Option<u64>> {
        let cf = self.cf(cf_name)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _value) = item?;
                Ok(Some(decode_id(&key)?))
            }
            None => Ok(None),
        }
    }

    /// Second halves of every `(owner, id)` key in an index column family.
    fn scan_index(&self, cf_name: &str, owner: u64) -> Result<Vec<u64>> {
        let cf = self.cf(cf_name)?;
        let start = pair_key(owner, 0);
        let prefix = owner.to_be_bytes();

        let mut ids = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, Direction::Forward))
        {
            let (key, _value) = item?;
            if key.len() != 16 || key[..8] != prefix[..] {
                break;
            }
            ids.push(decode_id(&key[8..])?);
        }
        Ok(ids)
    }

    fn account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, &id_key(account_id.0))
    }

    fn accounts_of(&self, user_id: UserId) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for id in self.scan_index(CF_USER_ACCOUNTS, user_id.0)? {
            let account = self
                .account(AccountId(id))?
                .ok_or_else(|| LedgerError::internal(format!("Dangling account index {}", id)))?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    fn latest_transfer_id(&self) -> Result<Option<TransferId>> {
        Ok(self.last_id(CF_TRANSFERS)?.map(TransferId))
    }
}

#[async_trait]
impl BalanceStore for RocksDBStore {
    async fn read_balance(&self, account_id: AccountId) -> Result<Option<Balance>> {
        Ok(self.account(account_id)?.map(|a| a.balance))
    }
}

#[async_trait]
impl TransferLedger for RocksDBStore {
    async fn history(&self, account_id: AccountId) -> Result<Vec<TransferRecord>> {
        let mut transfers = Vec::new();
        for id in self.scan_index(CF_ACCOUNT_TRANSFERS, account_id.0)? {
            let record = self
                .get_json(CF_TRANSFERS, &id_key(id))?
                .ok_or_else(|| LedgerError::internal(format!("Dangling transfer index {}", id)))?;
            transfers.push(record);
        }
        Ok(transfers)
    }

    async fn last_transfer_id(&self) -> Result<Option<TransferId>> {
        self.latest_transfer_id()
    }
}

#[async_trait]
impl AccountRegistry for RocksDBStore {
    async fn create_user(&self, username: String) -> Result<User> {
        let _guard = self.registry.lock().await;
        let user_id = UserId(self.last_id(CF_USERS)?.unwrap_or(0) + 1);
        let user = User { user_id, username };
        self.put_json(CF_USERS, &id_key(user_id.0), &user)?;
        Ok(user)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let _guard = self.registry.lock().await;
        let owner: User = self
            .get_json(CF_USERS, &id_key(account.user_id.0))?
            .ok_or(LedgerError::UserNotFound(account.user_id))?;
        let owned = self.accounts_of(account.user_id)?;

        let account_name = match account.account_name {
            Some(name) => {
                if owned.iter().any(|a| a.account_name == name) {
                    return Err(LedgerError::DuplicateAccountName {
                        user_id: account.user_id,
                        name,
                    });
                }
                name
            }
            None => Account::default_name(&owner.username, owned.len()),
        };

        let account_id = AccountId(self.last_id(CF_ACCOUNTS)?.unwrap_or(0) + 1);
        let created = Account {
            account_id,
            user_id: account.user_id,
            account_name,
            balance: account.balance,
        };

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ACCOUNTS)?,
            id_key(account_id.0),
            serde_json::to_vec(&created)?,
        );
        batch.put_cf(
            self.cf(CF_USER_ACCOUNTS)?,
            pair_key(account.user_id.0, account_id.0),
            b"",
        );
        self.db.write(batch)?;
        Ok(created)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.account(account_id)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.values(CF_ACCOUNTS)
    }

    /// Users and accounts are read from one snapshot, so a transfer committed
    /// mid-listing shows up on both of its accounts or on neither.
    async fn list_users(&self) -> Result<Vec<UserAccounts>> {
        let snapshot = self.db.snapshot();
        let users: Vec<User> =
            decode_values(snapshot.iterator_cf(self.cf(CF_USERS)?, IteratorMode::Start))?;
        let accounts: Vec<Account> =
            decode_values(snapshot.iterator_cf(self.cf(CF_ACCOUNTS)?, IteratorMode::Start))?;

        Ok(users
            .into_iter()
            .map(|user| UserAccounts {
                accounts: accounts
                    .iter()
                    .filter(|a| a.user_id == user.user_id)
                    .cloned()
                    .collect(),
                user_id: user.user_id,
                username: user.username,
            })
            .collect())
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(RocksDBUnitOfWork {
            store: self.clone(),
            accounts: HashMap::new(),
            appended: Vec::new(),
            base: None,
        }))
    }
}

/// Staged changes against a [`RocksDBStore`], written as one batch on commit.
pub struct RocksDBUnitOfWork {
    store: RocksDBStore,
    accounts: HashMap<AccountId, Account>,
    appended: Vec<TransferRecord>,
    base: Option<Option<TransferId>>,
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork {
    async fn read_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>> {
        if let Some(account) = self.accounts.get(&account_id) {
            return Ok(Some(account.balance));
        }
        self.store.read_balance(account_id).await
    }

    async fn write_balance(&mut self, account_id: AccountId, balance: Balance) -> Result<()> {
        let mut account = match self.accounts.remove(&account_id) {
            Some(account) => account,
            None => self
                .store
                .account(account_id)?
                .ok_or(LedgerError::AccountNotFound(account_id))?,
        };
        account.balance = balance;
        self.accounts.insert(account_id, account);
        Ok(())
    }

    async fn append(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        let base = match self.base {
            Some(base) => base,
            None => {
                let base = self.store.latest_transfer_id()?;
                self.base = Some(base);
                base
            }
        };
        let mut id = TransferId::after(base);
        id.0 += self.appended.len() as u64;

        let record = transfer.with_id(id);
        self.appended.push(record.clone());
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let RocksDBUnitOfWork {
            store,
            accounts,
            appended,
            base,
        } = *self;

        if let Some(base) = base {
            let current = store.latest_transfer_id()?;
            if current != base {
                return Err(LedgerError::SequenceConflict {
                    expected: TransferId::after(base),
                    found: TransferId::after(current),
                });
            }
        }

        let mut batch = WriteBatch::default();
        let cf_accounts = store.cf(CF_ACCOUNTS)?;
        for (account_id, account) in &accounts {
            batch.put_cf(cf_accounts, id_key(account_id.0), serde_json::to_vec(account)?);
        }

        let cf_transfers = store.cf(CF_TRANSFERS)?;
        let cf_index = store.cf(CF_ACCOUNT_TRANSFERS)?;
        for record in &appended {
            let id = record.transfer_id.0;
            batch.put_cf(cf_transfers, id_key(id), serde_json::to_vec(record)?);
            batch.put_cf(cf_index, pair_key(record.sender_id.0, id), b"");
            batch.put_cf(cf_index, pair_key(record.receiver_id.0, id), b"");
        }

        debug!(
            balances = accounts.len(),
            transfers = appended.len(),
            "writing rocksdb batch"
        );
        store.db.write(batch)?;
        Ok(())
    }
}
