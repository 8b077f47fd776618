//! Shared fixtures for the unit tests: ready-made ledgers, transactions
//! between genesis accounts, and a recording stand-in for a peer node.

pub mod test_utils;

pub use test_utils::*;
