use crate::core::{MinerId, Transaction, TRANSACTION_LEN};
use crate::error::{BlockchainError, Result};
use crate::utils::{
    check_digit_width, decode_digits, decode_raw, encode_digits, sha256_concat, Hash, FIELD_LEN,
    HASH_LEN,
};
use data_encoding::HEXLOWER;
use once_cell::sync::Lazy;

/// Size of the fixed block header on the wire:
/// nonce ‖ previous_hash ‖ hash ‖ height ‖ miner_id
pub const BLOCK_HEADER_LEN: usize = 5 * FIELD_LEN;

const GENESIS_MINER: &[u8] = b"genesis";

static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let mut label = [0u8; FIELD_LEN];
    label[FIELD_LEN - GENESIS_MINER.len()..].copy_from_slice(GENESIS_MINER);
    let miner_id = MinerId::from_bytes(label);
    let mut block = Block {
        nonce: 0,
        previous_hash: [0u8; HASH_LEN],
        hash: [0u8; HASH_LEN],
        height: 0,
        miner_id,
        transactions: Vec::new(),
    };
    block.hash = block.compute_hash();
    block
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    nonce: u128,
    previous_hash: Hash,
    hash: Hash,
    height: u128,
    miner_id: MinerId,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Build an unsealed block. The hash is left zeroed until the block is
    /// sealed by proof of work.
    pub fn new_draft(
        previous_hash: Hash,
        height: u128,
        miner_id: MinerId,
        transactions: Vec<Transaction>,
    ) -> Result<Block> {
        Ok(Block {
            nonce: 0,
            previous_hash,
            hash: [0u8; HASH_LEN],
            height: check_digit_width(height)?,
            miner_id,
            transactions,
        })
    }

    /// The fixed first block every ledger starts from. It holds no
    /// transactions and is not subject to proof of work.
    pub fn genesis() -> Block {
        GENESIS_BLOCK.clone()
    }

    pub fn get_nonce(&self) -> u128 {
        self.nonce
    }

    pub fn get_previous_hash(&self) -> &Hash {
        &self.previous_hash
    }

    pub fn get_hash(&self) -> &Hash {
        &self.hash
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash)
    }

    pub fn get_height(&self) -> u128 {
        self.height
    }

    pub fn get_miner_id(&self) -> &MinerId {
        &self.miner_id
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub(crate) fn set_seal(&mut self, nonce: u128, hash: Hash) {
        self.nonce = nonce;
        self.hash = hash;
    }

    pub(crate) fn set_nonce(&mut self, nonce: u128) {
        self.nonce = nonce;
    }

    /// Everything the hash covers after the nonce:
    /// previous_hash ‖ height ‖ miner_id ‖ transactions
    pub fn hash_suffix(&self) -> Vec<u8> {
        let mut data =
            Vec::with_capacity(3 * FIELD_LEN + self.transactions.len() * TRANSACTION_LEN);
        data.extend_from_slice(&self.previous_hash);
        data.extend_from_slice(&encode_digits(self.height));
        data.extend_from_slice(self.miner_id.as_bytes());
        for tx in &self.transactions {
            data.extend_from_slice(&tx.serialize());
        }
        data
    }

    /// sha256(nonce ‖ previous_hash ‖ height ‖ miner_id ‖ transactions)
    pub fn compute_hash(&self) -> Hash {
        let suffix = self.hash_suffix();
        sha256_concat(&[&encode_digits(self.nonce)[..], &suffix[..]])
    }

    /// Wire layout: nonce ‖ previous_hash ‖ hash ‖ height ‖ miner_id ‖ transactions
    pub fn serialize(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(BLOCK_HEADER_LEN + self.transactions.len() * TRANSACTION_LEN);
        out.extend_from_slice(&encode_digits(self.nonce));
        out.extend_from_slice(&self.previous_hash);
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&encode_digits(self.height));
        out.extend_from_slice(self.miner_id.as_bytes());
        for tx in &self.transactions {
            out.extend_from_slice(&tx.serialize());
        }
        out
    }

    /// Decode a block. The transaction count follows from the length; the
    /// hash field is taken as sent and checked by the ledger, not here.
    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        if bytes.len() < BLOCK_HEADER_LEN || (bytes.len() - BLOCK_HEADER_LEN) % TRANSACTION_LEN != 0
        {
            return Err(BlockchainError::Format(format!(
                "block of {} bytes is not a header plus whole transactions",
                bytes.len()
            )));
        }
        let field = |i: usize| &bytes[i * FIELD_LEN..(i + 1) * FIELD_LEN];
        let transactions = bytes[BLOCK_HEADER_LEN..]
            .chunks_exact(TRANSACTION_LEN)
            .map(Transaction::deserialize)
            .collect::<Result<Vec<_>>>()?;

        Ok(Block {
            nonce: decode_digits(field(0))?,
            previous_hash: decode_raw(field(1))?,
            hash: decode_raw(field(2))?,
            height: decode_digits(field(3))?,
            miner_id: MinerId::from_bytes(decode_raw(field(4))?),
            transactions,
        })
    }
}
