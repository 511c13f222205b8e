//! Application layer containing the core business logic orchestration.
//!
//! [`ledger::Ledger`] is the entry point. It validates requests, runs transfers
//! through the serialized [`engine::TransferEngine`] and answers balance and
//! history lookups through [`query::QueryService`].

pub mod engine;
pub mod ledger;
pub mod query;
