//! Gateway: the TCP listener that accepts control connections.

use crate::handlers::Registry;
use crate::network::Connection;
use crate::state::Engine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

/// Accepts incoming connections and spawns a task per client.
pub struct Gateway {
    listener: TcpListener,
    engine: Arc<Engine>,
    registry: Arc<Registry>,
}

impl Gateway {
    /// Bind the control listener. Failure here is fatal to the process.
    pub async fn bind(addr: SocketAddr, engine: Arc<Engine>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Control listener bound");
        Ok(Self {
            listener,
            engine,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Accept connections forever. A failed accept is logged and the loop
    /// continues; only the bind can take the server down.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.engine.next_conn_id();
                    let connection = Connection::new(
                        id,
                        addr,
                        stream,
                        Arc::clone(&self.engine),
                        Arc::clone(&self.registry),
                    );
                    tokio::spawn(connection.run());
                }
                Err(e) => {
                    error!(error = %e, "Accept failed");
                }
            }
        }
    }
}
