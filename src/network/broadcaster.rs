use crate::error::{BlockchainError, Result};
use log::{debug, warn};
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

pub const DEFAULT_BROADCAST_TIMEOUT_MS: u64 = 5000;

/// Delivery counts for one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Best-effort fan-out of wire frames to the configured peers.
///
/// Every delivery opens its own connection, writes the payload and closes.
/// A peer that cannot be reached is logged and skipped; the others still get
/// the payload.
#[derive(Debug, Clone)]
pub struct PeerBroadcaster {
    peers: Vec<SocketAddr>,
    timeout: Duration,
}

impl PeerBroadcaster {
    pub fn new(peers: Vec<SocketAddr>, timeout: Duration) -> PeerBroadcaster {
        PeerBroadcaster { peers, timeout }
    }

    pub fn get_peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    /// Send `payload` to every peer, waiting for each delivery to finish or fail
    pub fn broadcast(&self, payload: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for peer in &self.peers {
            match self.send_to(*peer, payload) {
                Ok(()) => {
                    debug!("Delivered {} bytes to {peer}", payload.len());
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Failed to deliver to peer {peer}: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn send_to(&self, addr: SocketAddr, payload: &[u8]) -> Result<()> {
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| BlockchainError::Network(format!("Failed to connect to {addr}: {e}")))?;

        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;

        stream
            .write_all(payload)
            .and_then(|_| stream.flush())
            .map_err(|e| BlockchainError::Network(format!("Failed to send data: {e}")))?;

        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
