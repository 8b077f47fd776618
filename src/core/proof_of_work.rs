use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::{encode_digits, sha256_concat, Hash, DIGIT_FIELD_LIMIT, HASH_LEN};
use log::{debug, info};
use std::time::Instant;

/// Nonce search that seals a block.
///
/// The search is monotonic: it starts at the draft's nonce and increments by
/// one per attempt, so a search cut short by `max_attempts` can be resumed
/// exactly where it stopped. Every attempt succeeds with probability about
/// `256^-difficulty`; without an attempt bound the search runs until it
/// succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
    max_attempts: Option<u64>,
}

impl ProofOfWork {
    /// `difficulty` is the number of leading zero bytes a sealed hash needs
    pub fn new(difficulty: usize) -> Result<ProofOfWork> {
        if difficulty > HASH_LEN {
            return Err(BlockchainError::Config(format!(
                "difficulty {difficulty} exceeds the {HASH_LEN}-byte hash"
            )));
        }
        Ok(ProofOfWork {
            difficulty,
            max_attempts: None,
        })
    }

    /// Give up after `attempts` hashes instead of searching forever
    pub fn with_attempt_limit(mut self, attempts: Option<u64>) -> ProofOfWork {
        self.max_attempts = attempts;
        self
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: usize) -> bool {
        difficulty <= HASH_LEN && hash[..difficulty].iter().all(|b| *b == 0)
    }

    /// Validate a sealed block: its stored hash must recompute and meet the target
    pub fn validate(block: &Block, difficulty: usize) -> bool {
        block.get_hash() == &block.compute_hash()
            && Self::meets_difficulty(block.get_hash(), difficulty)
    }

    /// Search nonces from the draft's current nonce until the hash meets the
    /// difficulty, then write the winning nonce and hash into the block.
    pub fn run(&self, mut block: Block) -> Result<Block> {
        let suffix = block.hash_suffix();
        let started = Instant::now();
        let mut nonce = block.get_nonce();
        let mut attempts: u64 = 0;

        info!(
            "Mining block at height {} with difficulty {}",
            block.get_height(),
            self.difficulty
        );

        loop {
            let hash = sha256_concat(&[&encode_digits(nonce)[..], &suffix[..]]);
            attempts += 1;
            if Self::meets_difficulty(&hash, self.difficulty) {
                block.set_seal(nonce, hash);
                info!(
                    "Sealed block {} at height {} after {attempts} attempts ({:?})",
                    block.get_hash_hex(),
                    block.get_height(),
                    started.elapsed()
                );
                return Ok(block);
            }

            if self.max_attempts.is_some_and(|limit| attempts >= limit) {
                debug!("Stopping search at nonce {nonce} after {attempts} attempts");
                return Err(BlockchainError::MiningExhausted { attempts });
            }

            nonce += 1;
            if nonce >= DIGIT_FIELD_LIMIT {
                return Err(BlockchainError::Mining(
                    "nonce space exhausted without a seal".to_string(),
                ));
            }
        }
    }
}
