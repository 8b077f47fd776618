//! Test utilities for ledger and network testing

use crate::core::{AccountId, Ledger, LedgerConfig, MinerId, Transaction};
use crate::network::Frame;
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Miner identity shared by every test ledger, so identical batches seal identically
pub const TEST_MINER: &str = "test-miner";

/// Create a ledger with the default 100 genesis accounts of 100000 each
pub fn create_test_ledger(tx_per_block: usize, difficulty: usize) -> Ledger {
    let miner = MinerId::from_label(TEST_MINER).expect("test miner label fits");
    Ledger::new(LedgerConfig::new(tx_per_block, difficulty, miner)).expect("valid test config")
}

/// Transfer between two genesis accounts
pub fn test_transaction(from: usize, to: usize, amount: u128, timestamp: u128) -> Transaction {
    Transaction::new(
        AccountId::genesis(from),
        AccountId::genesis(to),
        amount,
        timestamp,
    )
    .expect("test amounts fit in 32 digits")
}

/// Frame bytes for a transaction message
pub fn transaction_frame(tx: &Transaction) -> Vec<u8> {
    Frame::transaction(tx).into_bytes()
}

/// A stand-in peer: accepts `connections` inbound connections and returns
/// everything each one sent, in accept order.
pub fn spawn_recording_peer(connections: usize) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind recording peer");
    let addr = listener.local_addr().expect("recording peer address");
    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.expect("accept at recording peer");
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .expect("set read timeout");
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).expect("read from node");
            received.push(bytes);
        }
        received
    });
    (addr, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_ledger() {
        let ledger = create_test_ledger(3, 0);
        assert_eq!(ledger.tx_per_block(), 3);
        assert_eq!(ledger.difficulty(), 0);
        assert_eq!(ledger.balance(&AccountId::genesis(0)), Some(100_000));
    }

    #[test]
    fn test_transaction_frame_has_opcode() {
        let frame = transaction_frame(&test_transaction(0, 1, 1, 1));
        assert_eq!(frame.len(), 129);
        assert_eq!(frame[0], b'0');
    }
}
