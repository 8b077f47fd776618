use crate::config::Settings;
use crate::core::Ledger;
use crate::error::{BlockchainError, Result};
use crate::network::{Dispatcher, Frame, PeerBroadcaster};
use log::{error, info, warn};
use std::io::{BufReader, Write};
use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared by the accept loop and every connection handler
struct NodeContext {
    dispatcher: Dispatcher,
    broadcaster: PeerBroadcaster,
    idle_timeout: Duration,
    shutdown_on_close: bool,
    shutting_down: AtomicBool,
    local_addr: SocketAddr,
}

impl NodeContext {
    /// Flag the accept loop to stop and poke it awake with a throwaway connection
    fn request_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Close received, shutting down node");
        let mut wake = self.local_addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
            warn!("Failed to wake the listener at {wake}: {e}");
        }
    }
}

/// A ledger node listening for framed transactions and blocks
pub struct Server {
    listener: TcpListener,
    context: Arc<NodeContext>,
}

impl Server {
    /// Create the genesis ledger and bind the listening socket
    pub fn bind(settings: &Settings) -> Result<Server> {
        let ledger = Ledger::new(settings.ledger_config()?)?;
        Self::bind_with_ledger(settings, ledger)
    }

    pub fn bind_with_ledger(settings: &Settings, ledger: Ledger) -> Result<Server> {
        let addr = settings.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        let mut peers = settings.peer_addrs()?;
        peers.retain(|peer| {
            let is_self = *peer == local_addr;
            if is_self {
                warn!("Ignoring peer {peer}: it is this node's own address");
            }
            !is_self
        });

        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(ledger)))?;
        let broadcaster = PeerBroadcaster::new(peers, settings.broadcast_timeout());

        Ok(Server {
            listener,
            context: Arc::new(NodeContext {
                dispatcher,
                broadcaster,
                idle_timeout: settings.idle_timeout(),
                shutdown_on_close: settings.shutdown_on_close,
                shutting_down: AtomicBool::new(false),
                local_addr,
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.context.local_addr
    }

    /// Handle to the shared ledger, for inspection while the node runs
    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        Arc::clone(self.context.dispatcher.ledger())
    }

    /// Accept connections until a Close frame asks the node to stop.
    /// In-flight connections are drained before returning.
    pub fn run(self) -> Result<()> {
        info!(
            "Node listening on {} with {} peers",
            self.context.local_addr,
            self.context.broadcaster.get_peers().len()
        );
        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        for stream in self.listener.incoming() {
            if self.context.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };
                    info!("Accepted connection from {peer_addr}");

                    let context = Arc::clone(&self.context);
                    handlers.retain(|handle| !handle.is_finished());
                    handlers.push(thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(&context, stream, peer_addr) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    }));
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        info!("Waiting for {} open connections to finish", handlers.len());
        for handle in handlers {
            if handle.join().is_err() {
                error!("A connection handler panicked");
            }
        }
        if let Ok(ledger) = self.context.dispatcher.ledger().lock() {
            info!("Final ledger state: {}", ledger.summary());
        }
        Ok(())
    }

    /// Read frames until the peer hangs up, goes idle, or sends Close
    fn handle_connection(
        context: &NodeContext,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<()> {
        stream
            .set_read_timeout(Some(context.idle_timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;

        let reader = BufReader::new(&stream);
        let mut writer = &stream;
        let mut close_requested = false;

        for frame in context.dispatcher.demux(reader) {
            let frame = match frame {
                Ok(frame) => frame,
                Err(BlockchainError::IdleTimeout { discarded }) if discarded == 0 => {
                    info!("Connection from {peer_addr} idle, closing");
                    break;
                }
                Err(e) => {
                    warn!("Dropping connection from {peer_addr}: {e}");
                    break;
                }
            };

            let outcome = match context.dispatcher.route(&frame) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Rejected {} frame from {peer_addr}: {e}", frame.opcode());
                    continue;
                }
            };

            if outcome.broadcast {
                let report = context.broadcaster.broadcast(frame.as_bytes());
                for block in &outcome.sealed {
                    context.broadcaster.broadcast(Frame::block(block).as_bytes());
                }
                if report.failed > 0 {
                    warn!(
                        "{} frame reached {} of {} peers",
                        frame.opcode(),
                        report.delivered,
                        report.delivered + report.failed
                    );
                }
            }

            if let Some(reply) = &outcome.reply {
                writer.write_all(reply)?;
                writer.flush()?;
            }

            if outcome.close {
                close_requested = true;
                break;
            }
        }

        let _ = stream.shutdown(Shutdown::Both);
        if let Ok(ledger) = context.dispatcher.ledger().lock() {
            info!("Connection from {peer_addr} closed; ledger {}", ledger.summary());
        }

        if close_requested && context.shutdown_on_close {
            context.request_shutdown();
        }
        Ok(())
    }
}
