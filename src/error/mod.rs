//! Error handling for the ledger node
//!
//! `BlockchainError` covers faults (malformed frames, transport failures,
//! configuration problems). `ValidationError` covers the ordinary reasons a
//! transaction or block is turned away; those are resolved by the ledger and
//! never treated as process-level faults.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Crate-wide error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Malformed or truncated wire frame
    Format(String),
    /// A numeric field does not fit in 32 decimal digits
    FieldOverflow(u128),
    /// Network communication errors
    Network(String),
    /// File and socket I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// The connection went idle with a partial frame in flight
    IdleTimeout { discarded: usize },
    /// The configured attempt bound ran out before a seal was found
    MiningExhausted { attempts: u64 },
    /// Mining errors other than exhaustion
    Mining(String),
    /// A transaction or block was rejected by the ledger
    Validation(ValidationError),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Format(msg) => write!(f, "Format error: {msg}"),
            BlockchainError::FieldOverflow(value) => {
                write!(f, "Field overflow: {value} does not fit in 32 digits")
            }
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::IdleTimeout { discarded } => {
                write!(
                    f,
                    "Connection idle timeout, discarded {discarded} bytes of a partial frame"
                )
            }
            BlockchainError::MiningExhausted { attempts } => {
                write!(f, "Mining gave up after {attempts} attempts")
            }
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Validation(err) => write!(f, "Validation error: {err}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

impl From<ValidationError> for BlockchainError {
    fn from(err: ValidationError) -> Self {
        BlockchainError::Validation(err)
    }
}

/// Reasons the ledger refuses a transaction or a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The transaction's content hash was already applied
    DoubleSpend,
    /// Sender or receiver is not a known account
    UnknownAccount,
    /// Sender balance is below the amount
    InsufficientFunds { required: u128, available: u128 },
    /// The block does not extend the current tip
    ChainMismatch,
    /// The block is already part of the chain
    DuplicateBlock,
    /// The block hash does not recompute or misses the difficulty target
    InvalidProofOfWork,
    /// Structural problems with a received block
    InvalidBlock(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DoubleSpend => write!(f, "double spend"),
            ValidationError::UnknownAccount => write!(f, "unknown account"),
            ValidationError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "insufficient funds: required {required}, available {available}"
                )
            }
            ValidationError::ChainMismatch => write!(f, "block does not extend the chain tip"),
            ValidationError::DuplicateBlock => write!(f, "block already in chain"),
            ValidationError::InvalidProofOfWork => write!(f, "invalid proof of work"),
            ValidationError::InvalidBlock(msg) => write!(f, "invalid block: {msg}"),
        }
    }
}

impl std::error::Error for ValidationError {}
