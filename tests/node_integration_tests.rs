//! Node integration tests
//!
//! Runs a real node on an ephemeral port and talks to it over TCP. A plain
//! listener stands in for a peer and records every frame the node forwards.

use minibit::core::{AccountId, Block, Transaction};
use minibit::network::{request_block, send_frames, Frame};
use minibit::{Ledger, Server, Settings};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DONE: &[u8] = b"done";
const TIMEOUT: Duration = Duration::from_secs(10);

fn transfer(from: usize, to: usize, amount: u128, timestamp: u128) -> Transaction {
    Transaction::new(
        AccountId::genesis(from),
        AccountId::genesis(to),
        amount,
        timestamp,
    )
    .unwrap()
}

/// Records each inbound connection's bytes until a connection sends `DONE`
fn spawn_peer() -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            stream.set_read_timeout(Some(TIMEOUT)).unwrap();
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).unwrap();
            if bytes == DONE {
                break;
            }
            received.push(bytes);
        }
        received
    });
    (addr, handle)
}

fn finish_peer(addr: SocketAddr, handle: JoinHandle<Vec<Vec<u8>>>) -> Vec<Vec<u8>> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(DONE).unwrap();
    drop(stream);
    handle.join().unwrap()
}

fn start_node(
    peers: Vec<SocketAddr>,
    tx_per_block: usize,
    idle_timeout_secs: u64,
) -> (SocketAddr, Arc<Mutex<Ledger>>, JoinHandle<minibit::Result<()>>) {
    let settings = Settings {
        port: Some(0),
        peers: peers.iter().map(ToString::to_string).collect(),
        tx_per_block,
        difficulty: Some(1),
        miner_id: Some(String::from("node-under-test")),
        idle_timeout_secs,
        broadcast_timeout_ms: 2000,
        ..Settings::default()
    };
    settings.validate().unwrap();
    let server = Server::bind(&settings).unwrap();
    let addr = server.local_addr();
    let ledger = server.ledger();
    (addr, ledger, thread::spawn(move || server.run()))
}

/// Write frames, half-close, and collect whatever the node sends back
fn exchange(addr: SocketAddr, frames: &[Frame]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    for frame in frames {
        stream.write_all(frame.as_bytes()).unwrap();
    }
    stream.shutdown(Shutdown::Write).unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).unwrap();
    reply
}

fn close_node(addr: SocketAddr, node: JoinHandle<minibit::Result<()>>) {
    send_frames(addr, &[Frame::close()], TIMEOUT).unwrap();
    node.join().unwrap().unwrap();
}

#[test]
fn test_batch_is_forwarded_sealed_and_served() {
    let (peer, recorder) = spawn_peer();
    let (addr, ledger, node) = start_node(vec![peer], 2, 30);

    let first = transfer(0, 1, 500, 1);
    let second = transfer(1, 2, 250, 2);
    let reply = exchange(
        addr,
        &[
            Frame::transaction(&first),
            Frame::transaction(&second),
            Frame::get_block(1).unwrap(),
        ],
    );

    // the block fetched over the wire is the one the ledger sealed
    let sealed = ledger.lock().unwrap().tip().clone();
    assert_eq!(sealed.get_height(), 1);
    assert_eq!(sealed.get_hash()[0], 0);
    assert_eq!(reply, Frame::block(&sealed).into_bytes());
    assert_eq!(
        request_block(addr, 0, TIMEOUT).unwrap(),
        Some(Block::genesis())
    );
    assert_eq!(request_block(addr, 9, TIMEOUT).unwrap(), None);

    close_node(addr, node);
    let forwarded = finish_peer(peer, recorder);
    assert_eq!(
        forwarded,
        vec![
            Frame::transaction(&first).into_bytes(),
            Frame::transaction(&second).into_bytes(),
            Frame::block(&sealed).into_bytes(),
        ]
    );

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.balance(&AccountId::genesis(0)), Some(99_500));
    assert_eq!(ledger.balance(&AccountId::genesis(1)), Some(100_250));
    assert_eq!(ledger.balance(&AccountId::genesis(2)), Some(100_250));
    assert_eq!(ledger.pending_len(), 0);
}

#[test]
fn test_rejected_transactions_are_not_forwarded() {
    let (peer, recorder) = spawn_peer();
    let (addr, ledger, node) = start_node(vec![peer], 10, 30);

    let tx = transfer(3, 4, 10, 1);
    let overdraft = transfer(5, 6, 1_000_000, 1);
    exchange(
        addr,
        &[
            Frame::transaction(&tx),
            Frame::transaction(&tx),
            Frame::transaction(&overdraft),
        ],
    );

    close_node(addr, node);
    assert_eq!(
        finish_peer(peer, recorder),
        vec![Frame::transaction(&tx).into_bytes()]
    );
    assert_eq!(ledger.lock().unwrap().seen_count(), 1);
}

#[test]
fn test_unreachable_peer_does_not_stall_intake() {
    let dead = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (peer, recorder) = spawn_peer();
    let (addr, ledger, node) = start_node(vec![dead, peer], 10, 30);

    let tx = transfer(7, 8, 1, 1);
    exchange(addr, &[Frame::transaction(&tx)]);

    close_node(addr, node);
    assert_eq!(
        finish_peer(peer, recorder),
        vec![Frame::transaction(&tx).into_bytes()]
    );
    assert_eq!(ledger.lock().unwrap().pending_len(), 1);
}

#[test]
fn test_idle_connection_with_partial_frame_is_dropped() {
    let (addr, ledger, node) = start_node(vec![], 10, 1);
    let before = ledger.lock().unwrap().clone();

    let bytes = Frame::transaction(&transfer(0, 1, 5, 1)).into_bytes();
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream.write_all(&bytes[..60]).unwrap();

    let started = Instant::now();
    let mut rest = Vec::new();
    // the node hangs up once the idle timeout passes
    let _ = stream.read_to_end(&mut rest);
    assert!(rest.is_empty());
    assert!(started.elapsed() < TIMEOUT);
    assert_eq!(*ledger.lock().unwrap(), before);

    close_node(addr, node);
}

#[test]
fn test_unknown_opcode_ends_connection_after_earlier_frames() {
    let (addr, ledger, node) = start_node(vec![], 10, 30);

    let tx = transfer(9, 10, 3, 1);
    let mut bytes = Frame::transaction(&tx).into_bytes();
    bytes.push(b'7');
    bytes.extend_from_slice(&Frame::transaction(&transfer(9, 10, 4, 2)).into_bytes());

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream.write_all(&bytes).unwrap();
    stream.shutdown(Shutdown::Write).unwrap();
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest);

    close_node(addr, node);
    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.seen_count(), 1);
    assert!(ledger.has_seen(&tx.hash()));
}
