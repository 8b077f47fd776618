use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "minibit", about = "A minimal proof-of-work account ledger node")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "start", about = "Start a ledger node")]
    Start(StartArgs),
    #[command(name = "send", about = "Send a transfer between genesis accounts to a node")]
    Send {
        #[arg(long, help = "Node address as host:port")]
        node: String,
        #[arg(long, help = "Index of the sending genesis account")]
        from: usize,
        #[arg(long, help = "Index of the receiving genesis account")]
        to: usize,
        #[arg(long, help = "Amount to transfer")]
        amount: u128,
        #[arg(long, help = "Timestamp in milliseconds (defaults to now)")]
        timestamp: Option<u128>,
    },
    #[command(name = "getblock", about = "Fetch a block by height from a node")]
    GetBlock {
        #[arg(long, help = "Node address as host:port")]
        node: String,
        #[arg(long, help = "Block height, 0 is genesis")]
        height: u128,
    },
    #[command(name = "close", about = "Ask a node to shut down")]
    Close {
        #[arg(long, help = "Node address as host:port")]
        node: String,
    },
}

/// Flags for `start`; anything left out falls back to the config file or defaults
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    #[arg(long, help = "Interface to listen on (default 127.0.0.1)")]
    pub host: Option<String>,
    #[arg(long, help = "Port to listen on")]
    pub port: Option<u16>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated peer ports or host:port addresses"
    )]
    pub peers: Option<Vec<String>>,
    #[arg(long = "numtxinblock", help = "Transactions per block")]
    pub tx_per_block: Option<usize>,
    #[arg(long, help = "Required leading zero bytes in a block hash (0-32)")]
    pub difficulty: Option<usize>,
    #[arg(long = "max-attempts", help = "Give up a nonce search after this many tries")]
    pub max_attempts: Option<u64>,
    #[arg(long = "miner-id", help = "Label recorded in mined blocks (at most 32 bytes)")]
    pub miner_id: Option<String>,
    #[arg(long = "idle-timeout", help = "Seconds before an idle connection is dropped")]
    pub idle_timeout: Option<u64>,
    #[arg(long = "keep-running", help = "Keep serving after a close frame")]
    pub keep_running: bool,
    #[arg(long, help = "TOML settings file")]
    pub config: Option<PathBuf>,
}
