//! In-memory ledger state
//!
//! Account balances and the pool of applied-but-unsealed transactions.
//! Nothing here outlives the process.

pub mod account_set;
pub mod pending_pool;

pub use account_set::AccountSet;
pub use pending_pool::PendingPool;
