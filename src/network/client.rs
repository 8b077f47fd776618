use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::network::{Frame, Opcode};
use log::debug;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve `host:port` to the first address it names
pub fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| BlockchainError::Network(format!("Failed to resolve {addr}: {e}")))?
        .next()
        .ok_or_else(|| BlockchainError::Network(format!("No address found for {addr}")))
}

fn connect(addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    let stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| BlockchainError::Network(format!("Failed to connect to {addr}: {e}")))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_read_timeout(Some(timeout))?;
    Ok(stream)
}

/// Write `frames` back to back over one connection and hang up
pub fn send_frames(addr: SocketAddr, frames: &[Frame], timeout: Duration) -> Result<()> {
    let mut stream = connect(addr, timeout)?;
    for frame in frames {
        stream.write_all(frame.as_bytes())?;
        debug!("Sent {} frame to {addr}", frame.opcode());
    }
    stream.flush()?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Ask a node for the block at `height`.
///
/// The node answers with a block frame, or hangs up without a reply when it
/// has no block at that height.
pub fn request_block(addr: SocketAddr, height: u128, timeout: Duration) -> Result<Option<Block>> {
    let mut stream = connect(addr, timeout)?;
    stream.write_all(Frame::get_block(height)?.as_bytes())?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply)?;
    let Some((&tag, payload)) = reply.split_first() else {
        return Ok(None);
    };
    if Opcode::from_byte(tag)? != Opcode::Block {
        return Err(BlockchainError::Format(format!(
            "expected a block reply, got opcode byte 0x{tag:02x}"
        )));
    }
    Block::deserialize(payload).map(Some)
}
