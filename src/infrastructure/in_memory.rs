use crate::domain::account::{
    Account, AccountId, Balance, NewAccount, User, UserAccounts, UserId,
};
use crate::domain::ports::{AccountRegistry, BalanceStore, LedgerStore, TransferLedger, UnitOfWork};
use crate::domain::transfer::{NewTransfer, TransferId, TransferRecord};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    users: BTreeMap<UserId, User>,
    accounts: BTreeMap<AccountId, Account>,
    transfers: Vec<TransferRecord>,
}

impl LedgerState {
    fn last_transfer_id(&self) -> Option<TransferId> {
        self.transfers.last().map(|t| t.transfer_id)
    }
}

/// A thread-safe in-memory ledger.
///
/// All state sits behind one `Arc<RwLock<..>>`. Readers share the lock and a
/// commit applies every staged change under a single write guard, so a reader
/// never sees half of a transfer.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for InMemoryLedgerStore {
    async fn read_balance(&self, account_id: AccountId) -> Result<Option<Balance>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&account_id).map(|a| a.balance))
    }
}

#[async_trait]
impl TransferLedger for InMemoryLedgerStore {
    async fn history(&self, account_id: AccountId) -> Result<Vec<TransferRecord>> {
        let state = self.state.read().await;
        Ok(state
            .transfers
            .iter()
            .filter(|t| t.involves(account_id))
            .cloned()
            .collect())
    }

    async fn last_transfer_id(&self) -> Result<Option<TransferId>> {
        Ok(self.state.read().await.last_transfer_id())
    }
}

#[async_trait]
impl AccountRegistry for InMemoryLedgerStore {
    async fn create_user(&self, username: String) -> Result<User> {
        let mut state = self.state.write().await;
        let user_id = UserId(state.users.len() as u64 + 1);
        let user = User { user_id, username };
        state.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        let owner = state
            .users
            .get(&account.user_id)
            .ok_or(LedgerError::UserNotFound(account.user_id))?;

        let owned: Vec<&Account> = state
            .accounts
            .values()
            .filter(|a| a.user_id == account.user_id)
            .collect();

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

        let account_id = AccountId(state.accounts.len() as u64 + 1);
        let created = Account {
            account_id,
            user_id: account.user_id,
            account_name,
            balance: account.balance,
        };
        state.accounts.insert(account_id, created.clone());
        Ok(created)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.state.read().await.accounts.values().cloned().collect())
    }

    async fn list_users(&self) -> Result<Vec<UserAccounts>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .map(|user| UserAccounts {
                user_id: user.user_id,
                username: user.username.clone(),
                accounts: state
                    .accounts
                    .values()
                    .filter(|a| a.user_id == user.user_id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            state: Arc::clone(&self.state),
            balances: HashMap::new(),
            appended: Vec::new(),
            base: None,
        }))
    }
}

/// Staged changes against an [`InMemoryLedgerStore`].
pub struct InMemoryUnitOfWork {
    state: Arc<RwLock<LedgerState>>,
    balances: HashMap<AccountId, Balance>,
    appended: Vec<TransferRecord>,
    /// Last committed transfer id seen by the first append.
    base: Option<Option<TransferId>>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn read_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>> {
        if let Some(balance) = self.balances.get(&account_id) {
            return Ok(Some(*balance));
        }
        let state = self.state.read().await;
        Ok(state.accounts.get(&account_id).map(|a| a.balance))
    }

    async fn write_balance(&mut self, account_id: AccountId, balance: Balance) -> Result<()> {
        self.balances.insert(account_id, balance);
        Ok(())
    }

    async fn append(&mut self, transfer: NewTransfer) -> Result<TransferRecord> {
        let base = match self.base {
            Some(base) => base,
            None => {
                let base = self.state.read().await.last_transfer_id();
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
        let InMemoryUnitOfWork {
            state: shared,
            balances,
            appended,
            base,
        } = *self;
        let mut state = shared.write().await;

        if let Some(base) = base {
            let current = state.last_transfer_id();
            if current != base {
                return Err(LedgerError::SequenceConflict {
                    expected: TransferId::after(base),
                    found: TransferId::after(current),
                });
            }
        }
        if let Some(missing) = balances.keys().find(|id| !state.accounts.contains_key(id)) {
            return Err(LedgerError::AccountNotFound(*missing));
        }

        for (account_id, balance) in &balances {
            if let Some(account) = state.accounts.get_mut(account_id) {
                account.balance = *balance;
            }
        }
        debug!(
            balances = balances.len(),
            transfers = appended.len(),
            "committing in-memory unit of work"
        );
        state.transfers.extend(appended);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transfer::Amount;
    use chrono::Utc;

    async fn seeded() -> InMemoryLedgerStore {
        let store = InMemoryLedgerStore::new();
        let user = store.create_user("alice".to_string()).await.unwrap();
        for balance in [1800, 10] {
            store
                .create_account(NewAccount {
                    user_id: user.user_id,
                    account_name: None,
                    balance: Balance::new(balance).unwrap(),
                })
                .await
                .unwrap();
        }
        store
    }

    fn draft(sender: u64, receiver: u64) -> NewTransfer {
        NewTransfer {
            sender_id: AccountId(sender),
            receiver_id: AccountId(receiver),
            transfer_amount: Amount::new(200).unwrap(),
            sender_resulting_balance: Balance::new(1600).unwrap(),
            receiver_resulting_balance: Balance::new(210).unwrap(),
            transfer_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_registry_assigns_sequential_ids_and_names() {
        let store = seeded().await;
        let accounts = store.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].account_id, AccountId(1));
        assert_eq!(accounts[0].account_name, "alice Account #1");
        assert_eq!(accounts[1].account_name, "alice Account #2");
    }

    #[tokio::test]
    async fn test_duplicate_account_name_rejected() {
        let store = seeded().await;
        let result = store
            .create_account(NewAccount {
                user_id: UserId(1),
                account_name: Some("alice Account #1".to_string()),
                balance: Balance::ZERO,
            })
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::DuplicateAccountName { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let store = InMemoryLedgerStore::new();
        let result = store
            .create_account(NewAccount {
                user_id: UserId(999),
                account_name: Some("Bad".to_string()),
                balance: Balance::new(10).unwrap(),
            })
            .await;
        assert!(matches!(result, Err(LedgerError::UserNotFound(UserId(999)))));
    }

    #[tokio::test]
    async fn test_unit_of_work_commit_applies_everything() {
        let store = seeded().await;
        let mut work = store.begin().await.unwrap();
        work.write_balance(AccountId(1), Balance::new(1600).unwrap())
            .await
            .unwrap();
        work.write_balance(AccountId(2), Balance::new(210).unwrap())
            .await
            .unwrap();
        let record = work.append(draft(1, 2)).await.unwrap();
        assert_eq!(record.transfer_id, TransferId(1));

        // Staged writes are visible inside the unit but not outside it.
        assert_eq!(
            work.read_balance(AccountId(1)).await.unwrap(),
            Some(Balance::new(1600).unwrap())
        );
        assert_eq!(
            store.read_balance(AccountId(1)).await.unwrap(),
            Some(Balance::new(1800).unwrap())
        );

        work.commit().await.unwrap();
        assert_eq!(
            store.read_balance(AccountId(2)).await.unwrap(),
            Some(Balance::new(210).unwrap())
        );
        assert_eq!(store.history(AccountId(1)).await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let store = seeded().await;
        {
            let mut work = store.begin().await.unwrap();
            work.write_balance(AccountId(1), Balance::ZERO).await.unwrap();
            work.append(draft(1, 2)).await.unwrap();
        }
        assert_eq!(
            store.read_balance(AccountId(1)).await.unwrap(),
            Some(Balance::new(1800).unwrap())
        );
        assert!(store.history(AccountId(1)).await.unwrap().is_empty());
        assert_eq!(store.last_transfer_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_detects_sequence_conflict() {
        let store = seeded().await;
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.append(draft(1, 2)).await.unwrap();
        second.append(draft(1, 2)).await.unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;
        assert!(matches!(result, Err(LedgerError::SequenceConflict { .. })));
        assert_eq!(store.history(AccountId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_users_includes_users_without_accounts() {
        let store = seeded().await;
        store.create_user("bob".to_string()).await.unwrap();
        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].accounts.len(), 2);
        assert!(users[1].accounts.is_empty());
    }
}
