use crate::cli::StartArgs;
use crate::core::{
    LedgerConfig, MinerId, DEFAULT_GENESIS_ACCOUNTS, DEFAULT_INITIAL_BALANCE, DEFAULT_TX_PER_BLOCK,
    MAX_TX_PER_BLOCK,
};
use crate::error::{BlockchainError, Result};
use crate::network::DEFAULT_BROADCAST_TIMEOUT_MS;
use log::info;
use serde::Deserialize;
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
pub const MAX_DIFFICULTY: usize = 32;

/// Node settings, read from an optional TOML file and overridden by flags.
///
/// ```toml
/// port = 5000
/// peers = ["5001", "10.0.0.7:5002"]
/// tx_per_block = 4
/// difficulty = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: String,
    pub port: Option<u16>,
    /// Bare ports refer to `host`; anything else is resolved as `host:port`
    pub peers: Vec<String>,
    pub tx_per_block: usize,
    pub difficulty: Option<usize>,
    pub max_mining_attempts: Option<u64>,
    pub miner_id: Option<String>,
    pub idle_timeout_secs: u64,
    pub broadcast_timeout_ms: u64,
    pub shutdown_on_close: bool,
    pub genesis_accounts: usize,
    pub initial_balance: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: String::from(DEFAULT_HOST),
            port: None,
            peers: Vec::new(),
            tx_per_block: DEFAULT_TX_PER_BLOCK,
            difficulty: None,
            max_mining_attempts: None,
            miner_id: None,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            broadcast_timeout_ms: DEFAULT_BROADCAST_TIMEOUT_MS,
            shutdown_on_close: true,
            genesis_accounts: DEFAULT_GENESIS_ACCOUNTS,
            initial_balance: DEFAULT_INITIAL_BALANCE as u64,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Settings> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Build the settings for `start`: file (if any), then flags, then validation
    pub fn load(args: &StartArgs) -> Result<Settings> {
        let mut settings = match &args.config {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                Self::from_file(path)?
            }
            None => Settings::default(),
        };
        settings.apply_args(args);
        settings.validate()?;
        Ok(settings)
    }

    /// Flags that were given replace whatever the file said
    pub fn apply_args(&mut self, args: &StartArgs) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = Some(port);
        }
        if let Some(peers) = &args.peers {
            self.peers = peers.clone();
        }
        if let Some(tx_per_block) = args.tx_per_block {
            self.tx_per_block = tx_per_block;
        }
        if let Some(difficulty) = args.difficulty {
            self.difficulty = Some(difficulty);
        }
        if let Some(attempts) = args.max_attempts {
            self.max_mining_attempts = Some(attempts);
        }
        if let Some(miner_id) = &args.miner_id {
            self.miner_id = Some(miner_id.clone());
        }
        if let Some(secs) = args.idle_timeout {
            self.idle_timeout_secs = secs;
        }
        if args.keep_running {
            self.shutdown_on_close = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.is_none() {
            return Err(BlockchainError::Config(String::from("port is required")));
        }
        match self.difficulty {
            None => {
                return Err(BlockchainError::Config(String::from(
                    "difficulty is required",
                )))
            }
            Some(d) if d > MAX_DIFFICULTY => {
                return Err(BlockchainError::Config(format!(
                    "difficulty {d} exceeds {MAX_DIFFICULTY}"
                )))
            }
            Some(_) => {}
        }
        if self.tx_per_block == 0 || self.tx_per_block > MAX_TX_PER_BLOCK {
            return Err(BlockchainError::Config(format!(
                "tx_per_block must be between 1 and {MAX_TX_PER_BLOCK}"
            )));
        }
        if self.idle_timeout_secs == 0 {
            return Err(BlockchainError::Config(String::from(
                "idle_timeout_secs must be at least 1",
            )));
        }
        if self.broadcast_timeout_ms == 0 {
            return Err(BlockchainError::Config(String::from(
                "broadcast_timeout_ms must be at least 1",
            )));
        }
        if let Some(label) = &self.miner_id {
            MinerId::from_label(label)?;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let port = self
            .port
            .ok_or_else(|| BlockchainError::Config(String::from("port is required")))?;
        resolve_first((self.host.as_str(), port), &format!("{}:{port}", self.host))
    }

    /// Resolve every peer entry; a bare port means a node on our own host
    pub fn peer_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.peers
            .iter()
            .map(|peer| {
                let peer = peer.trim();
                match peer.parse::<u16>() {
                    Ok(port) => resolve_first((self.host.as_str(), port), peer),
                    Err(_) => resolve_first(peer, peer),
                }
            })
            .collect()
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }

    pub fn ledger_config(&self) -> Result<LedgerConfig> {
        let difficulty = self
            .difficulty
            .ok_or_else(|| BlockchainError::Config(String::from("difficulty is required")))?;
        let miner_id = match &self.miner_id {
            Some(label) => MinerId::from_label(label)?,
            None => MinerId::random(),
        };
        info!("Mining as {miner_id}");

        Ok(LedgerConfig {
            max_mining_attempts: self.max_mining_attempts,
            genesis_accounts: self.genesis_accounts,
            initial_balance: u128::from(self.initial_balance),
            ..LedgerConfig::new(self.tx_per_block, difficulty, miner_id)
        })
    }
}

fn resolve_first<A: ToSocketAddrs>(addr: A, label: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| BlockchainError::Config(format!("Invalid address {label}: {e}")))?
        .next()
        .ok_or_else(|| BlockchainError::Config(format!("No address found for {label}")))
}
