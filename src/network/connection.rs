//! Per-connection task: framed reads, command dispatch, and the outbound
//! queue.
//!
//! Each accepted socket gets one task running a `tokio::select!` loop over
//! two event sources: framed lines arriving from the client, and messages
//! queued on the connection's outbound channel (by its own handlers or by
//! other connections routing to it). The bounded channel is the per-socket
//! output buffer; once a reader stalls long enough to fill it, further
//! messages for it are dropped rather than blocking the tasks sending them.

use crate::error::CommandError;
use crate::handlers::{Context, Registry};
use crate::state::{ConnId, Engine};
use fennec_proto::{LineCodec, Message};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE: usize = 64;

/// One accepted control connection.
pub struct Connection {
    id: ConnId,
    addr: SocketAddr,
    stream: TcpStream,
    engine: Arc<Engine>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(
        id: ConnId,
        addr: SocketAddr,
        stream: TcpStream,
        engine: Arc<Engine>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            id,
            addr,
            stream,
            engine,
            registry,
        }
    }

    /// Run the connection until the client quits, disconnects, or errors.
    #[instrument(skip(self), fields(conn = self.id, addr = %self.addr), name = "connection")]
    pub async fn run(self) {
        info!("Client connected");

        let (read_half, write_half) = self.stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::new());
        let mut writer = FramedWrite::new(write_half, LineCodec::new());

        let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
        self.engine.attach(self.id, self.addr, tx.clone());

        loop {
            tokio::select! {
                result = reader.next() => {
                    match result {
                        Some(Ok(msg)) => {
                            debug!(raw = %msg, "Received line");
                            let mut ctx = Context {
                                conn: self.id,
                                engine: &self.engine,
                                sender: &tx,
                            };
                            match self.registry.dispatch(&mut ctx, &msg).await {
                                Ok(()) => {}
                                Err(CommandError::Quit(reason)) => {
                                    info!(reason = ?reason, "Client quit");
                                    break;
                                }
                                Err(CommandError::Send(_)) => break,
                                Err(e) => {
                                    debug!(error = %e, "Command rejected");
                                    if let Some(reply) = e.to_reply() {
                                        match tx.try_send(reply) {
                                            Ok(()) => {}
                                            Err(TrySendError::Full(_)) => {
                                                warn!("Outbound queue full, dropping reply");
                                            }
                                            Err(TrySendError::Closed(_)) => break,
                                        }
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                        None => {
                            info!("Client disconnected");
                            break;
                        }
                    }
                }

                Some(msg) = rx.recv() => {
                    if let Err(e) = writer.send(msg).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
        }

        // Flush anything already queued (the quit broadcast, a final error
        // reply) before the socket drops.
        while let Ok(msg) = rx.try_recv() {
            if writer.send(msg).await.is_err() {
                break;
            }
        }

        self.engine.detach(self.id).await;
        info!("Connection closed");
    }
}
