use crate::domain::transfer::Amount;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a user, assigned sequentially starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier of an account, assigned sequentially starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative integer account balance.
///
/// The only way to lower a balance is [`Balance::withdraw`], which refuses to
/// go below zero, so a `Balance` value can never be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Result<Self, LedgerError> {
        if value >= 0 {
            Ok(Self(value))
        } else {
            Err(LedgerError::ValidationError(
                "Account balance must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Returns the balance left after taking `amount` out, or `None` if that
    /// would drive it below zero.
    pub fn withdraw(self, amount: Amount) -> Option<Self> {
        let remaining = self.0.checked_sub(amount.value())?;
        (remaining >= 0).then_some(Self(remaining))
    }

    /// Returns the balance after adding `amount`, or `None` on overflow.
    pub fn deposit(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.value()).map(Self)
    }
}

impl TryFrom<i64> for Balance {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
}

/// A balance-holding account owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub account_name: String,
    pub balance: Balance,
}

impl Account {
    /// Name given to an account created without an explicit one.
    ///
    /// `existing` is the number of accounts the user already owns.
    pub fn default_name(username: &str, existing: usize) -> String {
        format!("{} Account #{}", username, existing + 1)
    }
}

/// Request to open an account, already checked by the registry service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub user_id: UserId,
    pub account_name: Option<String>,
    pub balance: Balance,
}

/// A user together with every account they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccounts {
    pub user_id: UserId,
    pub username: String,
    pub accounts: Vec<Account>,
}
