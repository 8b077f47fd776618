// Fixed-width field codec shared by transactions, blocks and wire messages.
// Numeric fields travel as 32 ASCII digits, left-padded with '0'; hashes and
// identifiers travel as 32 raw bytes.
use crate::error::{BlockchainError, Result};

/// Width of every wire field
pub const FIELD_LEN: usize = 32;

/// Exclusive upper bound of a digit field (10^32)
pub const DIGIT_FIELD_LIMIT: u128 = 100_000_000_000_000_000_000_000_000_000_000;

/// Reject values that cannot be written as 32 digits
pub fn check_digit_width(value: u128) -> Result<u128> {
    if value >= DIGIT_FIELD_LIMIT {
        return Err(BlockchainError::FieldOverflow(value));
    }
    Ok(value)
}

/// Write `value` as 32 left-zero-padded ASCII digits.
///
/// Callers guarantee `value < DIGIT_FIELD_LIMIT`; every constructor that
/// accepts a digit field goes through [`check_digit_width`].
pub fn encode_digits(value: u128) -> [u8; FIELD_LEN] {
    debug_assert!(value < DIGIT_FIELD_LIMIT);
    let mut out = [b'0'; FIELD_LEN];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        if rest == 0 {
            break;
        }
        *slot = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    out
}

pub fn decode_digits(field: &[u8]) -> Result<u128> {
    if field.len() != FIELD_LEN {
        return Err(BlockchainError::Format(format!(
            "digit field must be {FIELD_LEN} bytes, got {}",
            field.len()
        )));
    }
    field.iter().try_fold(0u128, |acc, byte| {
        if !byte.is_ascii_digit() {
            return Err(BlockchainError::Format(format!(
                "digit field contains non-digit byte 0x{byte:02x}"
            )));
        }
        // 32 digits always fit in u128
        Ok(acc * 10 + u128::from(byte - b'0'))
    })
}

/// Copy a 32-byte raw field out of `bytes`
pub fn decode_raw(field: &[u8]) -> Result<[u8; FIELD_LEN]> {
    field.try_into().map_err(|_| {
        BlockchainError::Format(format!(
            "raw field must be {FIELD_LEN} bytes, got {}",
            field.len()
        ))
    })
}

/// Left-pad `bytes` with NUL into a 32-byte field
pub fn pad_raw(bytes: &[u8]) -> Result<[u8; FIELD_LEN]> {
    if bytes.len() > FIELD_LEN {
        return Err(BlockchainError::Format(format!(
            "value of {} bytes does not fit a {FIELD_LEN}-byte field",
            bytes.len()
        )));
    }
    let mut out = [0u8; FIELD_LEN];
    out[FIELD_LEN - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}
