// This is the account-balance ledger - the single piece of mutable state in the node
// It owns balances, the double-spend record, the pending batch and the sealed chain
// Callers share one Ledger behind a mutex; every method here assumes exclusive access

use crate::core::{AccountId, Block, MinerId, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result, ValidationError};
use crate::storage::{AccountSet, PendingPool};
use crate::utils::Hash;
use log::{debug, info, warn};
use std::collections::HashSet;

pub const DEFAULT_TX_PER_BLOCK: usize = 50_000;
pub const DEFAULT_GENESIS_ACCOUNTS: usize = 100;
pub const DEFAULT_INITIAL_BALANCE: u128 = 100_000;
/// Keeps a block frame, and the buffer read for it, around 128 MB at most
pub const MAX_TX_PER_BLOCK: usize = 1_000_000;

/// Everything a ledger needs to know at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub tx_per_block: usize,
    pub difficulty: usize,
    pub max_mining_attempts: Option<u64>,
    pub miner_id: MinerId,
    pub genesis_accounts: usize,
    pub initial_balance: u128,
}

impl LedgerConfig {
    pub fn new(tx_per_block: usize, difficulty: usize, miner_id: MinerId) -> LedgerConfig {
        LedgerConfig {
            tx_per_block,
            difficulty,
            max_mining_attempts: None,
            miner_id,
            genesis_accounts: DEFAULT_GENESIS_ACCOUNTS,
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }
}

/// Result of offering a transaction to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Applied; carries every block sealed during the call in chain order: a
    /// batch left over from an exhausted search first, then the batch this
    /// transaction completed
    Applied(Vec<Block>),
    Rejected(ValidationError),
}

impl TxOutcome {
    pub fn sealed(&self) -> &[Block] {
        match self {
            TxOutcome::Applied(blocks) => blocks,
            TxOutcome::Rejected(_) => &[],
        }
    }

    pub fn into_sealed(self) -> Vec<Block> {
        match self {
            TxOutcome::Applied(blocks) => blocks,
            TxOutcome::Rejected(_) => Vec::new(),
        }
    }
}

/// Result of offering a block to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Accepted,
    Rejected(ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    accounts: AccountSet,
    seen_tx_hashes: HashSet<Hash>,
    pending: PendingPool,
    blocks: Vec<Block>,
    pow: ProofOfWork,
    miner_id: MinerId,
    tx_per_block: usize,
    // Where the next search for the current batch starts; non-zero only after
    // an attempt-bounded search gave up
    resume_nonce: u128,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Ledger> {
        if config.tx_per_block == 0 || config.tx_per_block > MAX_TX_PER_BLOCK {
            return Err(BlockchainError::Config(format!(
                "transactions per block must be between 1 and {MAX_TX_PER_BLOCK}"
            )));
        }
        let pow = ProofOfWork::new(config.difficulty)?.with_attempt_limit(config.max_mining_attempts);

        info!(
            "Creating ledger with {} genesis accounts, {} transactions per block, difficulty {}",
            config.genesis_accounts, config.tx_per_block, config.difficulty
        );

        Ok(Ledger {
            accounts: AccountSet::genesis(config.genesis_accounts, config.initial_balance),
            seen_tx_hashes: HashSet::new(),
            pending: PendingPool::new(config.tx_per_block),
            blocks: vec![Block::genesis()],
            pow,
            miner_id: config.miner_id,
            tx_per_block: config.tx_per_block,
            resume_nonce: 0,
        })
    }

    // When a transaction arrives, I check it against the double-spend record and balances
    // If it is valid I apply it right away and, once the batch is full, seal a block
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<TxOutcome> {
        let hash = tx.hash();
        if self.seen_tx_hashes.contains(&hash) {
            return Ok(TxOutcome::Rejected(ValidationError::DoubleSpend));
        }
        if let Err(reason) =
            self.accounts
                .check_transfer(tx.get_sender(), tx.get_receiver(), tx.get_amount())
        {
            return Ok(TxOutcome::Rejected(reason));
        }

        let mut sealed = Vec::new();

        // A batch left full by an exhausted search gets another round before this one joins.
        // Mining never touches balances, so the check above still holds afterwards
        if self.pending.is_full() {
            warn!("Pending batch is full from an earlier search, retrying it first");
            let block = self.mine()?;
            info!("Retried batch sealed as block {}", block.get_hash_hex());
            sealed.push(block);
        }

        self.accounts
            .transfer(tx.get_sender(), tx.get_receiver(), tx.get_amount())?;
        self.seen_tx_hashes.insert(hash);
        self.pending.add(tx.clone(), hash);
        debug!("Applied {tx} ({} pending)", self.pending.len());

        if !self.pending.is_full() {
            return Ok(TxOutcome::Applied(sealed));
        }

        // The transaction stays applied even when the search gives up; the batch
        // is retried on the next intake
        match self.mine() {
            Ok(block) => sealed.push(block),
            Err(BlockchainError::MiningExhausted { attempts }) => {
                warn!("Mining stopped after {attempts} attempts, batch kept pending");
            }
            Err(e) => return Err(e),
        }
        Ok(TxOutcome::Applied(sealed))
    }

    // This is where I turn the pending batch into a sealed block at the top of the chain
    pub fn mine(&mut self) -> Result<Block> {
        let tip = self.tip();
        let mut draft = Block::new_draft(
            *tip.get_hash(),
            tip.get_height() + 1,
            self.miner_id,
            self.pending.get_all().to_vec(),
        )?;
        draft.set_nonce(self.resume_nonce);

        let block = match self.pow.run(draft) {
            Ok(block) => block,
            Err(BlockchainError::MiningExhausted { attempts }) => {
                self.resume_nonce += u128::from(attempts);
                return Err(BlockchainError::MiningExhausted { attempts });
            }
            Err(e) => return Err(e),
        };

        self.pending.clear();
        self.resume_nonce = 0;
        self.blocks.push(block.clone());
        info!(
            "Appended block {} at height {} with {} transactions",
            block.get_hash_hex(),
            block.get_height(),
            block.get_transactions().len()
        );
        Ok(block)
    }

    // When a peer sends me a block, I only take it if it extends my tip and checks out
    // Its transactions are either already in my pending batch or get applied here, all or nothing
    pub fn apply_block(&mut self, block: Block) -> Result<BlockOutcome> {
        if let Err(reason) = self.check_block_header(&block) {
            return Ok(BlockOutcome::Rejected(reason));
        }

        let mut staged = self.accounts.clone();
        let mut in_block: HashSet<Hash> = HashSet::new();
        let mut sealed_pending: HashSet<Hash> = HashSet::new();

        for tx in block.get_transactions() {
            let hash = tx.hash();
            if !in_block.insert(hash) {
                return Ok(BlockOutcome::Rejected(ValidationError::DoubleSpend));
            }
            if self.pending.contains(&hash) {
                sealed_pending.insert(hash);
                continue;
            }
            if self.seen_tx_hashes.contains(&hash) {
                return Ok(BlockOutcome::Rejected(ValidationError::DoubleSpend));
            }
            if let Err(reason) = staged.transfer(tx.get_sender(), tx.get_receiver(), tx.get_amount())
            {
                return Ok(BlockOutcome::Rejected(reason));
            }
        }

        self.accounts = staged;
        self.seen_tx_hashes.extend(in_block);
        self.pending.remove_sealed(&sealed_pending);
        self.resume_nonce = 0;
        info!(
            "Accepted block {} at height {} from miner {} ({} of its transactions were pending here)",
            block.get_hash_hex(),
            block.get_height(),
            block.get_miner_id(),
            sealed_pending.len()
        );
        self.blocks.push(block);
        Ok(BlockOutcome::Accepted)
    }

    fn check_block_header(&self, block: &Block) -> std::result::Result<(), ValidationError> {
        if self.blocks.iter().any(|b| b.get_hash() == block.get_hash()) {
            return Err(ValidationError::DuplicateBlock);
        }
        let tip = self.tip();
        if block.get_previous_hash() != tip.get_hash() || block.get_height() != tip.get_height() + 1
        {
            return Err(ValidationError::ChainMismatch);
        }
        if block.get_transactions().len() != self.tx_per_block {
            return Err(ValidationError::InvalidBlock(format!(
                "expected {} transactions, found {}",
                self.tx_per_block,
                block.get_transactions().len()
            )));
        }
        if !ProofOfWork::validate(block, self.pow.get_difficulty()) {
            return Err(ValidationError::InvalidProofOfWork);
        }
        Ok(())
    }

    pub fn get_block(&self, height: u128) -> Option<&Block> {
        let index = usize::try_from(height).ok()?;
        self.blocks.get(index)
    }

    pub fn tip(&self) -> &Block {
        // the chain always holds at least the genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u128 {
        self.tip().get_height()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn balance(&self, account: &AccountId) -> Option<u128> {
        self.accounts.balance(account)
    }

    pub fn total_balance(&self) -> u128 {
        self.accounts.total_balance()
    }

    pub fn has_seen(&self, hash: &Hash) -> bool {
        self.seen_tx_hashes.contains(hash)
    }

    pub fn seen_count(&self) -> usize {
        self.seen_tx_hashes.len()
    }

    pub fn pending(&self) -> &[Transaction] {
        self.pending.get_all()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn tx_per_block(&self) -> usize {
        self.tx_per_block
    }

    pub fn difficulty(&self) -> usize {
        self.pow.get_difficulty()
    }

    pub fn summary(&self) -> String {
        format!(
            "height {}, {} pending, {} applied transactions, total balance {}",
            self.height(),
            self.pending.len(),
            self.seen_tx_hashes.len(),
            self.total_balance()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{create_test_ledger, test_transaction};

    #[test]
    fn test_new_ledger_starts_at_genesis() {
        let ledger = create_test_ledger(2, 0);
        assert_eq!(ledger.height(), 0);
        assert_eq!(ledger.tip(), &Block::genesis());
        assert_eq!(ledger.total_balance(), 100 * 100_000);
        assert_eq!(ledger.seen_count(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_batch_size() {
        for size in [0, MAX_TX_PER_BLOCK + 1, usize::MAX] {
            let config = LedgerConfig::new(size, 0, MinerId::from_label("m").unwrap());
            assert!(matches!(Ledger::new(config), Err(BlockchainError::Config(_))));
        }
    }

    #[test]
    fn test_apply_transaction_moves_funds() {
        let mut ledger = create_test_ledger(10, 0);
        let tx = test_transaction(0, 1, 500, 1);

        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Applied(vec![]));
        assert_eq!(ledger.balance(&AccountId::genesis(0)), Some(99_500));
        assert_eq!(ledger.balance(&AccountId::genesis(1)), Some(100_500));
        assert_eq!(ledger.seen_count(), 1);
        assert!(ledger.has_seen(&tx.hash()));
        assert_eq!(ledger.pending(), &[tx]);
    }

    #[test]
    fn test_double_spend_leaves_state_unchanged() {
        let mut ledger = create_test_ledger(10, 0);
        let tx = test_transaction(0, 1, 500, 1);
        ledger.apply_transaction(&tx).unwrap();
        let snapshot = ledger.clone();

        assert_eq!(
            ledger.apply_transaction(&tx).unwrap(),
            TxOutcome::Rejected(ValidationError::DoubleSpend)
        );
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_rejections_do_not_mutate() {
        let mut ledger = create_test_ledger(10, 0);
        let snapshot = ledger.clone();

        let overdraw = test_transaction(0, 1, 100_001, 1);
        assert_eq!(
            ledger.apply_transaction(&overdraw).unwrap(),
            TxOutcome::Rejected(ValidationError::InsufficientFunds {
                required: 100_001,
                available: 100_000
            })
        );

        let stranger = Transaction::new(AccountId::genesis(0), AccountId::genesis(500), 1, 1).unwrap();
        assert_eq!(
            ledger.apply_transaction(&stranger).unwrap(),
            TxOutcome::Rejected(ValidationError::UnknownAccount)
        );
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_full_batch_is_mined() {
        let mut ledger = create_test_ledger(2, 0);
        let genesis_hash = *ledger.tip().get_hash();

        let first = ledger.apply_transaction(&test_transaction(0, 1, 5, 1)).unwrap();
        assert_eq!(first, TxOutcome::Applied(vec![]));

        let second = ledger.apply_transaction(&test_transaction(1, 2, 5, 2)).unwrap();
        let [block] = second.sealed() else {
            panic!("expected one sealed block, got {second:?}");
        };
        assert_eq!(block.get_height(), 1);
        assert_eq!(block.get_previous_hash(), &genesis_hash);
        assert_eq!(block.get_transactions().len(), 2);
        assert_eq!(ledger.pending_len(), 0);
        assert_eq!(ledger.tip(), block);
    }

    #[test]
    fn test_get_block() {
        let ledger = create_test_ledger(2, 0);
        assert_eq!(ledger.get_block(0), Some(&Block::genesis()));
        assert_eq!(ledger.get_block(5), None);
        assert_eq!(ledger.get_block(u128::MAX), None);
    }

    #[test]
    fn test_exhausted_search_is_retried_on_next_intake() {
        let mut config = LedgerConfig::new(1, 1, MinerId::from_label("slow").unwrap());
        config.max_mining_attempts = Some(1);
        let mut ledger = Ledger::new(config).unwrap();

        // one nonce per call, so most batches are sealed by a later intake
        let mut returned = Vec::new();
        let mut timestamp = 0;
        while ledger.height() < 5 {
            timestamp += 1;
            assert!(timestamp < 100_000, "search never resumed");
            match ledger.apply_transaction(&test_transaction(0, 1, 1, timestamp)) {
                Ok(outcome) => returned.extend(outcome.into_sealed()),
                Err(BlockchainError::MiningExhausted { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(returned.as_slice(), &ledger.blocks()[1..]);
        for block in &returned {
            assert_eq!(block.get_transactions().len(), 1);
            assert!(ProofOfWork::validate(block, 1));
        }
    }

    #[test]
    fn test_rejected_intake_leaves_stalled_batch_alone() {
        let mut config = LedgerConfig::new(1, 32, MinerId::from_label("stuck").unwrap());
        config.max_mining_attempts = Some(1);
        let mut ledger = Ledger::new(config).unwrap();

        let tx = test_transaction(0, 1, 1, 1);
        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Applied(vec![]));
        assert_eq!(ledger.pending_len(), 1);
        let snapshot = ledger.clone();

        assert_eq!(
            ledger.apply_transaction(&tx).unwrap(),
            TxOutcome::Rejected(ValidationError::DoubleSpend)
        );
        assert_eq!(ledger, snapshot);

        // a valid intake retries first; if that round gives up too, nothing is applied
        let next = test_transaction(2, 3, 1, 2);
        assert!(matches!(
            ledger.apply_transaction(&next),
            Err(BlockchainError::MiningExhausted { attempts: 1 })
        ));
        assert!(!ledger.has_seen(&next.hash()));
        assert_eq!(ledger.balance(&AccountId::genesis(2)), Some(100_000));
        assert_eq!(ledger.height(), 0);
    }

    #[test]
    fn test_apply_block_from_peer() {
        let mut miner = create_test_ledger(2, 1);
        let mut follower = create_test_ledger(2, 1);
        let a = test_transaction(0, 1, 10, 1);
        let b = test_transaction(2, 3, 20, 2);

        // the follower saw only the first transaction before the block arrived
        follower.apply_transaction(&a).unwrap();
        miner.apply_transaction(&a).unwrap();
        let Some(block) = miner.apply_transaction(&b).unwrap().into_sealed().pop() else {
            panic!("miner should have sealed a block");
        };

        assert_eq!(follower.apply_block(block.clone()).unwrap(), BlockOutcome::Accepted);
        assert_eq!(follower.height(), 1);
        assert_eq!(follower.pending_len(), 0);
        assert_eq!(follower.balance(&AccountId::genesis(3)), Some(100_020));
        assert_eq!(follower.total_balance(), miner.total_balance());
        assert!(follower.has_seen(&b.hash()));

        assert_eq!(
            follower.apply_block(block).unwrap(),
            BlockOutcome::Rejected(ValidationError::DuplicateBlock)
        );
    }

    #[test]
    fn test_apply_block_rejects_wrong_parent() {
        let mut miner = create_test_ledger(1, 0);
        let mut other = create_test_ledger(1, 0);
        miner.apply_transaction(&test_transaction(0, 1, 1, 1)).unwrap();
        let outcome = miner.apply_transaction(&test_transaction(0, 1, 1, 2)).unwrap();
        let Some(second) = outcome.into_sealed().pop() else {
            panic!("expected a block at height 2");
        };

        let snapshot = other.clone();
        assert_eq!(
            other.apply_block(second).unwrap(),
            BlockOutcome::Rejected(ValidationError::ChainMismatch)
        );
        assert_eq!(other, snapshot);
    }

    #[test]
    fn test_apply_block_rejects_bad_contents() {
        let mut miner = create_test_ledger(1, 0);
        let outcome = miner.apply_transaction(&test_transaction(0, 1, 1, 1)).unwrap();
        let Some(block) = outcome.into_sealed().pop() else {
            panic!("expected a block");
        };

        // a follower that already spent this transaction in a sealed block of its own
        let mut follower = create_test_ledger(1, 0);
        follower.apply_transaction(&test_transaction(0, 1, 1, 1)).unwrap();
        assert_eq!(
            follower.apply_block(block.clone()).unwrap(),
            BlockOutcome::Rejected(ValidationError::DuplicateBlock)
        );

        // a block carrying an overdraft is refused in full
        let mut poor = Ledger::new(LedgerConfig {
            initial_balance: 0,
            ..LedgerConfig::new(1, 0, MinerId::from_label("poor").unwrap())
        })
        .unwrap();
        let snapshot = poor.clone();
        assert!(matches!(
            poor.apply_block(block).unwrap(),
            BlockOutcome::Rejected(ValidationError::InsufficientFunds { .. })
        ));
        assert_eq!(poor, snapshot);
    }

    #[test]
    fn test_apply_block_rejects_insufficient_work() {
        let mut miner = create_test_ledger(1, 0);
        let outcome = miner.apply_transaction(&test_transaction(0, 1, 1, 1)).unwrap();
        let Some(block) = outcome.into_sealed().pop() else {
            panic!("expected a block");
        };
        // difficulty 0 seals on the first nonce, so the hash is almost surely not zero-prefixed
        let mut strict = create_test_ledger(1, 2);
        if block.get_hash()[..2] != [0, 0] {
            assert_eq!(
                strict.apply_block(block).unwrap(),
                BlockOutcome::Rejected(ValidationError::InvalidProofOfWork)
            );
        }
    }
}
