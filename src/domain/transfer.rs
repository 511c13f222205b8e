use crate::domain::account::{AccountId, Balance};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger position of a committed transfer. The first transfer is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub u64);

impl TransferId {
    pub const FIRST: Self = Self(1);

    /// Id following `last`, or the first id for an empty ledger.
    pub fn after(last: Option<TransferId>) -> Self {
        last.map_or(Self::FIRST, |id| Self(id.0 + 1))
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive transfer amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, LedgerError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(LedgerError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transfer request that passed caller-side validation.
///
/// Sender and receiver are distinct and the amount is positive. The transfer
/// engine only accepts this type, so a rejected request never reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOrder {
    sender: AccountId,
    receiver: AccountId,
    amount: Amount,
}

impl TransferOrder {
    pub fn new(sender: AccountId, receiver: AccountId, amount: i64) -> Result<Self, LedgerError> {
        if sender == receiver {
            return Err(LedgerError::ValidationError(
                "Sender and receiver must be different accounts".to_string(),
            ));
        }
        let amount = Amount::new(amount)?;
        Ok(Self {
            sender,
            receiver,
            amount,
        })
    }

    pub fn sender(&self) -> AccountId {
        self.sender
    }

    pub fn receiver(&self) -> AccountId {
        self.receiver
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// Everything a ledger append needs except the id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub transfer_amount: Amount,
    pub sender_resulting_balance: Balance,
    pub receiver_resulting_balance: Balance,
    pub transfer_time: DateTime<Utc>,
}

impl NewTransfer {
    pub fn with_id(self, transfer_id: TransferId) -> TransferRecord {
        TransferRecord {
            transfer_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            transfer_amount: self.transfer_amount,
            sender_resulting_balance: self.sender_resulting_balance,
            receiver_resulting_balance: self.receiver_resulting_balance,
            transfer_time: self.transfer_time,
        }
    }
}

/// An immutable, committed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub transfer_amount: Amount,
    pub sender_resulting_balance: Balance,
    pub receiver_resulting_balance: Balance,
    pub transfer_time: DateTime<Utc>,
}

impl TransferRecord {
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender_id == account || self.receiver_id == account
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Sender,
    Receiver,
}

/// A transfer as seen from one of its two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub transfer_id: TransferId,
    pub account_role: AccountRole,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub transfer_amount: Amount,
    pub resulting_balance: Balance,
    pub transfer_time: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn for_account(record: &TransferRecord, account: AccountId) -> Self {
        let (account_role, resulting_balance) = if record.sender_id == account {
            (AccountRole::Sender, record.sender_resulting_balance)
        } else {
            (AccountRole::Receiver, record.receiver_resulting_balance)
        };
        Self {
            transfer_id: record.transfer_id,
            account_role,
            sender_id: record.sender_id,
            receiver_id: record.receiver_id,
            transfer_amount: record.transfer_amount,
            resulting_balance,
            transfer_time: record.transfer_time,
        }
    }
}

/// Transfer history of one account, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatement {
    pub account_id: AccountId,
    pub transfers: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sender: u64, receiver: u64) -> TransferRecord {
        NewTransfer {
            sender_id: AccountId(sender),
            receiver_id: AccountId(receiver),
            transfer_amount: Amount::new(200).unwrap(),
            sender_resulting_balance: Balance::new(1800).unwrap(),
            receiver_resulting_balance: Balance::new(210).unwrap(),
            transfer_time: Utc::now(),
        }
        .with_id(TransferId::FIRST)
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(1).is_ok());
        assert!(matches!(
            Amount::new(0),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(-1),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_order_rejects_same_account() {
        let result = TransferOrder::new(AccountId(1), AccountId(1), 50);
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }

    #[test]
    fn test_order_rejects_non_positive_amount() {
        let result = TransferOrder::new(AccountId(1), AccountId(2), 0);
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
    }

    #[test]
    fn test_transfer_id_sequence() {
        assert_eq!(TransferId::after(None), TransferId(1));
        assert_eq!(TransferId::after(Some(TransferId(41))), TransferId(42));
    }

    #[test]
    fn test_history_entry_roles() {
        let record = record(2, 1);

        let as_receiver = HistoryEntry::for_account(&record, AccountId(1));
        assert_eq!(as_receiver.account_role, AccountRole::Receiver);
        assert_eq!(as_receiver.resulting_balance.value(), 210);

        let as_sender = HistoryEntry::for_account(&record, AccountId(2));
        assert_eq!(as_sender.account_role, AccountRole::Sender);
        assert_eq!(as_sender.resulting_balance.value(), 1800);
    }

    #[test]
    fn test_history_entry_serialization() {
        let entry = HistoryEntry::for_account(&record(2, 1), AccountId(1));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["account_role"], "receiver");
        assert_eq!(json["transfer_id"], 1);
        assert_eq!(json["resulting_balance"], 210);
    }
}
