use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, info, LevelFilter};
use minibit::network::DEFAULT_CLIENT_TIMEOUT;
use minibit::{
    current_timestamp, request_block, resolve, send_frames, AccountId, Command, Frame, Opt,
    Server, Settings, Transaction,
};
use std::process;

fn main() {
    // Info by default, RUST_LOG can still raise or lower it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Start(args) => {
            let settings = Settings::load(&args)?;
            let server = Server::bind(&settings)?;
            server.run()?;
            info!("Node stopped");
        }
        Command::Send {
            node,
            from,
            to,
            amount,
            timestamp,
        } => {
            let timestamp = match timestamp {
                Some(timestamp) => timestamp,
                None => current_timestamp()?,
            };
            let tx = Transaction::new(
                AccountId::genesis(from),
                AccountId::genesis(to),
                amount,
                timestamp,
            )?;
            send_frames(resolve(&node)?, &[Frame::transaction(&tx)], DEFAULT_CLIENT_TIMEOUT)?;
            println!("Sent {tx}");
        }
        Command::GetBlock { node, height } => {
            match request_block(resolve(&node)?, height, DEFAULT_CLIENT_TIMEOUT)? {
                Some(block) => {
                    println!("Height:        {}", block.get_height());
                    println!("Hash:          {}", block.get_hash_hex());
                    println!("Previous hash: {}", HEXLOWER.encode(block.get_previous_hash()));
                    println!("Nonce:         {}", block.get_nonce());
                    println!("Miner:         {}", block.get_miner_id());
                    for tx in block.get_transactions() {
                        println!("- {tx}");
                    }
                }
                None => println!("No block at height {height}"),
            }
        }
        Command::Close { node } => {
            send_frames(resolve(&node)?, &[Frame::close()], DEFAULT_CLIENT_TIMEOUT)?;
            println!("Close sent to {node}");
        }
    }
    Ok(())
}
