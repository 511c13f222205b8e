//! Domain types and the storage ports the application layer is written against.

pub mod account;
pub mod ports;
pub mod transfer;
