use crate::core::{Block, BlockOutcome, Ledger, TxOutcome};
use crate::error::{BlockchainError, Result, ValidationError};
use crate::network::{Frame, Message, Opcode};
use log::{debug, info, warn};
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard};

/// What the connection handler should do after a frame was routed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Forward the original frame to every peer
    pub broadcast: bool,
    /// Blocks sealed while handling the frame, in chain order; forwarded after the frame
    pub sealed: Vec<Block>,
    /// Bytes to write back on the same connection
    pub reply: Option<Vec<u8>>,
    /// Stop reading and close the connection
    pub close: bool,
    /// Why the ledger turned the frame away, if it did
    pub rejection: Option<ValidationError>,
}

impl RouteOutcome {
    fn forward(sealed: Vec<Block>) -> RouteOutcome {
        RouteOutcome {
            broadcast: true,
            sealed,
            ..RouteOutcome::default()
        }
    }

    fn rejected(reason: ValidationError) -> RouteOutcome {
        RouteOutcome {
            rejection: Some(reason),
            ..RouteOutcome::default()
        }
    }
}

/// Splits a byte stream into frames using the per-opcode size table.
///
/// Iteration ends at a clean end of stream. Every error also ends it: a
/// truncated payload means the stream is exhausted, an unknown tag leaves no
/// way to find the next frame boundary, and a timeout closes the connection.
pub struct FrameReader<R> {
    reader: R,
    tx_per_block: usize,
    finished: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R, tx_per_block: usize) -> FrameReader<R> {
        FrameReader {
            reader,
            tx_per_block,
            finished: false,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut tag = [0u8; 1];
        match fill(&mut self.reader, &mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err((filled, e)) => return Err(transport_error(filled, e)),
        }

        let opcode = Opcode::from_byte(tag[0])?;
        let expected = opcode.payload_len(self.tx_per_block);
        let mut bytes = vec![0u8; 1 + expected];
        bytes[0] = tag[0];

        match fill(&mut self.reader, &mut bytes[1..]) {
            Ok(received) if received < expected => Err(BlockchainError::Format(format!(
                "truncated {opcode} frame: expected {expected} payload bytes, received {received}"
            ))),
            Ok(_) => Ok(Some(Frame::from_wire(opcode, bytes))),
            Err((filled, e)) => Err(transport_error(1 + filled, e)),
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Read until `buf` is full or the stream ends; returns how much was filled.
/// On a read error, returns the partial count alongside the error.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::result::Result<usize, (usize, io::Error)> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err((filled, e)),
        }
    }
    Ok(filled)
}

fn transport_error(discarded: usize, err: io::Error) -> BlockchainError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            BlockchainError::IdleTimeout { discarded }
        }
        _ => BlockchainError::Io(err.to_string()),
    }
}

/// Routes decoded frames to the shared ledger.
///
/// Each call to [`Dispatcher::route`] holds the ledger lock from decoding
/// through validation, mutation and any mining the frame triggers. Sealing a
/// block therefore stalls every other connection until the seal is found.
#[derive(Clone)]
pub struct Dispatcher {
    ledger: Arc<Mutex<Ledger>>,
    tx_per_block: usize,
}

impl Dispatcher {
    pub fn new(ledger: Arc<Mutex<Ledger>>) -> Result<Dispatcher> {
        let tx_per_block = lock_ledger(&ledger)?.tx_per_block();
        Ok(Dispatcher {
            ledger,
            tx_per_block,
        })
    }

    pub fn ledger(&self) -> &Arc<Mutex<Ledger>> {
        &self.ledger
    }

    pub fn tx_per_block(&self) -> usize {
        self.tx_per_block
    }

    /// Lazily split `reader` into frames
    pub fn demux<R: Read>(&self, reader: R) -> FrameReader<R> {
        FrameReader::new(reader, self.tx_per_block)
    }

    /// Apply one frame to the ledger.
    ///
    /// Malformed content is returned as `Format`; ledger rejections come back
    /// inside the outcome and never as errors.
    pub fn route(&self, frame: &Frame) -> Result<RouteOutcome> {
        let mut ledger = lock_ledger(&self.ledger)?;
        let message = frame.decode(self.tx_per_block)?;
        debug!("Routing {} frame", message.opcode());

        match message {
            Message::Transaction(tx) => match ledger.apply_transaction(&tx)? {
                TxOutcome::Applied(sealed) => {
                    info!("Accepted {tx}");
                    Ok(RouteOutcome::forward(sealed))
                }
                TxOutcome::Rejected(reason) => {
                    warn!("Rejected {tx}: {reason}");
                    Ok(RouteOutcome::rejected(reason))
                }
            },
            Message::Block(block) => {
                let hash = block.get_hash_hex();
                match ledger.apply_block(block)? {
                    BlockOutcome::Accepted => Ok(RouteOutcome::forward(Vec::new())),
                    BlockOutcome::Rejected(reason) => {
                        warn!("Rejected block {hash}: {reason}");
                        Ok(RouteOutcome::rejected(reason))
                    }
                }
            }
            Message::GetBlock(height) => match ledger.get_block(height) {
                Some(block) => Ok(RouteOutcome {
                    reply: Some(Frame::block(block).into_bytes()),
                    ..RouteOutcome::default()
                }),
                None => {
                    info!("No block at height {height} (tip is {})", ledger.height());
                    Ok(RouteOutcome::default())
                }
            },
            Message::Close => Ok(RouteOutcome {
                close: true,
                ..RouteOutcome::default()
            }),
        }
    }
}

fn lock_ledger(ledger: &Mutex<Ledger>) -> Result<MutexGuard<'_, Ledger>> {
    ledger
        .lock()
        .map_err(|e| BlockchainError::Network(format!("Failed to acquire ledger lock: {e}")))
}
