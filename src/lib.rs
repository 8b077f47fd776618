//! # Minibit - A Minimal Proof-of-Work Account Ledger
//!
//! A node keeps a balance per account, batches accepted transfers, mines each
//! full batch into a block, and forwards what it accepts to its peers.
//!
//! ## What's Here
//! - **Ledger**: Account balances, double-spend tracking, and the block chain
//! - **Proof of Work**: SHA-256 nonce search against a leading-zero-byte target
//! - **Wire Protocol**: Fixed-size frames tagged with a one-byte opcode
//! - **Node**: A thread per connection sharing one ledger behind a mutex
//!
//! ## How the Code Is Organized
//! - `core/`: Accounts, transactions, blocks, mining, and the ledger itself
//! - `storage/`: The in-memory account set and the pending transaction pool
//! - `network/`: Frame decoding, routing, peer broadcast, and the TCP server
//! - `config/`: Settings from defaults, a TOML file, and flags
//! - `utils/`: Hashing, timestamps, and fixed-width field encoding
//! - `cli/`: Command-line interface for the node and its client helpers
//!
//! ## Where to Start Reading
//! 1. `main.rs` for the commands
//! 2. `core/ledger.rs` for how transactions and blocks change state
//! 3. `network/dispatcher.rs` for how bytes off the wire reach the ledger
//! 4. `network/server.rs` for the connection lifecycle

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt, StartArgs};
pub use config::Settings;
pub use core::{
    AccountId, Block, BlockOutcome, Ledger, LedgerConfig, MinerId, ProofOfWork, Transaction,
    TxOutcome,
};
pub use error::{BlockchainError, Result, ValidationError};
pub use network::{
    request_block, resolve, send_frames, Dispatcher, Frame, Message, Opcode, PeerBroadcaster,
    RouteOutcome, Server,
};
pub use storage::{AccountSet, PendingPool};
pub use utils::{current_timestamp, sha256_digest, Hash};
