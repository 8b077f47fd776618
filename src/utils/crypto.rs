use ring::digest::{Context, SHA256};

use crate::error::{BlockchainError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length in bytes of every hash the node produces
pub const HASH_LEN: usize = 32;

pub type Hash = [u8; HASH_LEN];

pub fn current_timestamp() -> Result<u128> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Io(format!("System time error: {e}")))?;
    Ok(duration.as_millis())
}

pub fn sha256_digest(data: &[u8]) -> Hash {
    sha256_concat(&[data])
}

/// Hash several byte slices as if they were one contiguous buffer
pub fn sha256_concat(parts: &[&[u8]]) -> Hash {
    let mut context = Context::new(&SHA256);
    for part in parts {
        context.update(part);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(context.finish().as_ref());
    out
}
