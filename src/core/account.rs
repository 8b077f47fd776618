use crate::error::{BlockchainError, Result};
use crate::utils::{decode_raw, pad_raw, sha256_digest, FIELD_LEN};
use data_encoding::HEXLOWER;
use std::fmt;
use std::str::FromStr;

/// A 32-byte account identifier derived from a hash.
///
/// Rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; FIELD_LEN]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; FIELD_LEN]) -> AccountId {
        AccountId(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<AccountId> {
        Ok(AccountId(decode_raw(bytes)?))
    }

    /// The identifier of the `index`-th genesis account: the SHA-256 of the
    /// index written in ASCII decimal.
    pub fn genesis(index: usize) -> AccountId {
        AccountId(sha256_digest(index.to_string().as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; FIELD_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for AccountId {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = HEXLOWER
            .decode(s.to_ascii_lowercase().as_bytes())
            .map_err(|e| BlockchainError::Format(format!("Invalid account id {s}: {e}")))?;
        AccountId::from_slice(&bytes)
    }
}

/// Identity a node stamps into the blocks it mines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MinerId([u8; FIELD_LEN]);

impl MinerId {
    pub fn from_bytes(bytes: [u8; FIELD_LEN]) -> MinerId {
        MinerId(bytes)
    }

    /// Build a miner id from a label of at most 32 bytes, left-padded with NUL
    pub fn from_label(label: &str) -> Result<MinerId> {
        pad_raw(label.as_bytes())
            .map(MinerId)
            .map_err(|_| BlockchainError::Config(format!("Miner id {label:?} exceeds 32 bytes")))
    }

    /// A random identity: a v4 UUID in its 32-character simple form
    pub fn random() -> MinerId {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        let mut bytes = [0u8; FIELD_LEN];
        bytes.copy_from_slice(simple.as_bytes());
        MinerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FIELD_LEN] {
        &self.0
    }
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: Vec<u8> = self.0.iter().copied().skip_while(|b| *b == 0).collect();
        match std::str::from_utf8(&label) {
            Ok(text) if !text.is_empty() => f.write_str(text),
            _ => f.write_str(&HEXLOWER.encode(&self.0)),
        }
    }
}
