//! Peer-to-peer networking
//!
//! This module handles the framed wire protocol between nodes: decoding the
//! byte stream into frames, routing them to the ledger, forwarding accepted
//! work to peers, and the small client used by the command line.

pub mod broadcaster;
pub mod client;
pub mod dispatcher;
pub mod message;
pub mod server;

pub use broadcaster::{BroadcastReport, PeerBroadcaster, DEFAULT_BROADCAST_TIMEOUT_MS};
pub use client::{request_block, resolve, send_frames, DEFAULT_CLIENT_TIMEOUT};
pub use dispatcher::{Dispatcher, FrameReader, RouteOutcome};
pub use message::{Frame, Message, Opcode};
pub use server::Server;
