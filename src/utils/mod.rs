//! Utility functions and helpers
//!
//! This module contains the hashing helpers and the fixed-width field codec
//! used by every wire format the node speaks.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_concat, sha256_digest, Hash, HASH_LEN};

pub use serialization::{
    check_digit_width, decode_digits, decode_raw, encode_digits, pad_raw, DIGIT_FIELD_LIMIT,
    FIELD_LEN,
};
