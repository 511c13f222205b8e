//! A small ledger: users, accounts, and atomic funds transfers between accounts
//! with an append-only transfer history.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
