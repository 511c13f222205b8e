use crate::application::engine::TransferEngine;
use crate::application::query::QueryService;
use crate::domain::account::{Account, AccountId, Balance, NewAccount, User, UserAccounts, UserId};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transfer::{AccountStatement, TransferOrder, TransferRecord};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The ledger service: registry, transfers and queries over one store.
///
/// This is the entry point the command line (or any other shell) talks to.
/// It validates requests before they reach the [`TransferEngine`] and is
/// cheap to share behind an `Arc` between concurrent tasks.
pub struct Ledger {
    store: LedgerStoreRef,
    engine: TransferEngine,
    queries: QueryService,
}

impl Ledger {
    pub fn new(store: LedgerStoreRef) -> Self {
        Self {
            engine: TransferEngine::new(Arc::clone(&store)),
            queries: QueryService::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.with_timeout(timeout);
        self
    }

    pub async fn create_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::ValidationError(
                "username cannot be blank".to_string(),
            ));
        }
        let user = self.store.create_user(username.to_string()).await?;
        info!(user_id = %user.user_id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn create_account(
        &self,
        user_id: UserId,
        account_name: Option<String>,
        balance: i64,
    ) -> Result<Account> {
        let balance = Balance::new(balance)?;
        let account_name = account_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let account = self
            .store
            .create_account(NewAccount {
                user_id,
                account_name,
                balance,
            })
            .await?;
        info!(
            account_id = %account.account_id,
            user_id = %account.user_id,
            balance = %account.balance,
            "account created"
        );
        Ok(account)
    }

    pub async fn get_account(&self, account_id: AccountId) -> Result<Account> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.store.list_accounts().await
    }

    pub async fn list_users(&self) -> Result<Vec<UserAccounts>> {
        self.store.list_users().await
    }

    /// Validates the request and hands it to the transfer engine.
    ///
    /// A request naming the same account twice or a non-positive amount is
    /// rejected with `ValidationError` without touching the engine.
    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: i64,
    ) -> Result<TransferRecord> {
        let order = TransferOrder::new(sender, receiver, amount)?;
        self.engine.transfer(order).await
    }

    pub async fn balance_of(&self, account_id: AccountId) -> Result<Balance> {
        self.queries.balance_of(account_id).await
    }

    pub async fn history_of(&self, account_id: AccountId) -> Result<Vec<TransferRecord>> {
        self.queries.history_of(account_id).await
    }

    pub async fn statement_of(&self, account_id: AccountId) -> Result<AccountStatement> {
        self.queries.statement_of(account_id).await
    }
}
