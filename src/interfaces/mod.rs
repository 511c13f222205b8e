//! Adapters between the outside world and the [`Ledger`](crate::application::ledger::Ledger).

pub mod batch;
pub mod csv;
