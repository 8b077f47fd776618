// A transfer of `amount` units from one account to another.
// Transactions carry no signatures; their identity is the SHA-256 of the
// 128-byte wire form, which is what the double-spend record stores.

use crate::core::AccountId;
use crate::error::{BlockchainError, Result};
use crate::utils::{check_digit_width, decode_digits, encode_digits, sha256_digest, Hash, FIELD_LEN};
use data_encoding::HEXLOWER;
use std::fmt;

/// Size of a transaction on the wire, opcode excluded
pub const TRANSACTION_LEN: usize = 4 * FIELD_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    sender: AccountId,
    receiver: AccountId,
    amount: u128,
    timestamp: u128,
}

impl Transaction {
    /// Build a transaction, rejecting numeric fields wider than 32 digits
    pub fn new(
        sender: AccountId,
        receiver: AccountId,
        amount: u128,
        timestamp: u128,
    ) -> Result<Transaction> {
        Ok(Transaction {
            sender,
            receiver,
            amount: check_digit_width(amount)?,
            timestamp: check_digit_width(timestamp)?,
        })
    }

    pub fn get_sender(&self) -> &AccountId {
        &self.sender
    }

    pub fn get_receiver(&self) -> &AccountId {
        &self.receiver
    }

    pub fn get_amount(&self) -> u128 {
        self.amount
    }

    pub fn get_timestamp(&self) -> u128 {
        self.timestamp
    }

    /// Wire layout: sender(32) ‖ receiver(32) ‖ amount(32) ‖ timestamp(32)
    pub fn serialize(&self) -> [u8; TRANSACTION_LEN] {
        let mut out = [0u8; TRANSACTION_LEN];
        out[..FIELD_LEN].copy_from_slice(self.sender.as_bytes());
        out[FIELD_LEN..2 * FIELD_LEN].copy_from_slice(self.receiver.as_bytes());
        out[2 * FIELD_LEN..3 * FIELD_LEN].copy_from_slice(&encode_digits(self.amount));
        out[3 * FIELD_LEN..].copy_from_slice(&encode_digits(self.timestamp));
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        if bytes.len() != TRANSACTION_LEN {
            return Err(BlockchainError::Format(format!(
                "transaction must be {TRANSACTION_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Transaction {
            sender: AccountId::from_slice(&bytes[..FIELD_LEN])?,
            receiver: AccountId::from_slice(&bytes[FIELD_LEN..2 * FIELD_LEN])?,
            amount: decode_digits(&bytes[2 * FIELD_LEN..3 * FIELD_LEN])?,
            timestamp: decode_digits(&bytes[3 * FIELD_LEN..])?,
        })
    }

    /// Content hash over sender ‖ receiver ‖ amount ‖ timestamp
    pub fn hash(&self) -> Hash {
        sha256_digest(&self.serialize())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx {} [{} -> {} amount {} at {}]",
            &HEXLOWER.encode(&self.hash())[..16],
            &self.sender.to_hex()[..16],
            &self.receiver.to_hex()[..16],
            self.amount,
            self.timestamp
        )
    }
}
