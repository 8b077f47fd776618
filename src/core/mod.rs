//! Core ledger functionality
//!
//! This module contains the fundamental components: accounts, transactions,
//! blocks, the proof-of-work miner, and the ledger that ties them together.

pub mod account;
pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use account::{AccountId, MinerId};
pub use block::{Block, BLOCK_HEADER_LEN};
pub use ledger::{
    BlockOutcome, Ledger, LedgerConfig, TxOutcome, DEFAULT_GENESIS_ACCOUNTS,
    DEFAULT_INITIAL_BALANCE, DEFAULT_TX_PER_BLOCK, MAX_TX_PER_BLOCK,
};
pub use proof_of_work::ProofOfWork;
pub use transaction::{Transaction, TRANSACTION_LEN};
