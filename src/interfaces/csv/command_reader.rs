use crate::domain::account::{AccountId, UserId};
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    User,
    Account,
    Transfer,
}

/// One raw CSV row: `type, user, name, sender, receiver, amount`.
///
/// Which columns are required depends on the type; the rest may be empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub user: Option<u64>,
    pub name: Option<String>,
    pub sender: Option<u64>,
    pub receiver: Option<u64>,
    pub amount: Option<i64>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum LedgerCommand {
    CreateUser {
        username: String,
    },
    CreateAccount {
        user_id: UserId,
        account_name: Option<String>,
        balance: i64,
    },
    Transfer {
        sender: AccountId,
        receiver: AccountId,
        amount: i64,
    },
}

fn required<T>(value: Option<T>, column: &str, kind: &str) -> Result<T> {
    value.ok_or_else(|| {
        LedgerError::ValidationError(format!("{} command requires '{}'", kind, column))
    })
}

impl TryFrom<CommandRecord> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        match record.r#type {
            CommandType::User => Ok(LedgerCommand::CreateUser {
                username: required(record.name, "name", "user")?,
            }),
            CommandType::Account => Ok(LedgerCommand::CreateAccount {
                user_id: UserId(required(record.user, "user", "account")?),
                account_name: record.name,
                balance: required(record.amount, "amount", "account")?,
            }),
            CommandType::Transfer => Ok(LedgerCommand::Transfer {
                sender: AccountId(required(record.sender, "sender", "transfer")?),
                receiver: AccountId(required(record.receiver, "receiver", "transfer")?),
                amount: required(record.amount, "amount", "transfer")?,
            }),
        }
    }
}

/// Reads ledger commands from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and accepting short rows so that
/// trailing empty columns can be left out.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts commands.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader.into_deserialize().map(|result| {
            let record: CommandRecord = result?;
            LedgerCommand::try_from(record)
        })
    }
}
