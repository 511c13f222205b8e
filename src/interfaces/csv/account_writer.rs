use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

const HEADER: [&str; 4] = ["account_id", "user_id", "account_name", "balance"];

/// Writes accounts as CSV with the header `account_id,user_id,account_name,balance`.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    /// Writes the header followed by one row per account, even when there are none.
    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
