//! Transfer table and offer setup.

use crate::state::{ConnId, Engine, TransferId};
use crate::transfer::{Transfer, task};
use dashmap::DashMap;
use fennec_proto::DccSend;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Registry of live transfers, keyed by [`TransferId`].
///
/// Ids are allocated from a monotonic counter and never reused, so two
/// concurrent offers of files with the same name stay distinct entries.
pub struct TransferManager {
    transfers: DashMap<TransferId, Arc<Transfer>>,
    seq: AtomicU64,
}

impl TransferManager {
    pub fn new() -> Self {
        Self {
            transfers: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> TransferId {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, id: TransferId) -> Option<Arc<Transfer>> {
        self.transfers.get(&id).map(|e| e.value().clone())
    }

    /// Transfers with an open data socket.
    pub fn active_count(&self) -> usize {
        self.transfers.iter().filter(|e| e.is_active()).count()
    }

    /// Drop every closed transfer from the table. Returns how many were
    /// removed.
    pub fn reap(&self) -> usize {
        let before = self.transfers.len();
        self.transfers.retain(|_, t| !t.is_closed());
        let removed = before - self.transfers.len();
        if removed > 0 {
            debug!(removed, "Reaped finished transfers");
        }
        removed
    }

    /// Flag every live transfer for abort. Used on shutdown.
    pub fn abort_all(&self) {
        for entry in self.transfers.iter() {
            entry.value().abort();
        }
    }
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Set up an outbound offer: open the file, bind an ephemeral listener,
/// register the transfer, and spawn its streaming task.
///
/// Returns the CTCP payload to relay to the receiver. An I/O error here
/// (unreadable file, no ports) aborts the offer before anything is
/// registered.
pub async fn offer(
    engine: &Arc<Engine>,
    sender_conn: ConnId,
    sender_nick: &str,
    receiver_nick: &str,
    filename: &str,
) -> std::io::Result<DccSend> {
    let file = File::open(filename).await?;
    let size = file.metadata().await?.len();

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    let port = listener.local_addr()?.port();

    let id = engine.transfers.next_id();
    let transfer = Arc::new(Transfer::new(
        id,
        filename.to_string(),
        sender_nick.to_string(),
        receiver_nick.to_string(),
        sender_conn,
        size,
    ));
    engine.transfers.transfers.insert(id, transfer.clone());
    info!(
        transfer = id,
        file = %filename,
        from = %sender_nick,
        to = %receiver_nick,
        size,
        port,
        "Transfer offered"
    );

    tokio::spawn(task::run(engine.clone(), transfer, listener, file));

    Ok(DccSend {
        filename: filename.to_string(),
        addr: engine.transfer_config.advertise_ip,
        port,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferState;

    fn manager_with(states: &[TransferState]) -> TransferManager {
        let m = TransferManager::new();
        for &state in states {
            let id = m.next_id();
            let t = Arc::new(Transfer::new(
                id,
                "f.bin".into(),
                "alice".into(),
                "bob".into(),
                1,
                10,
            ));
            t.set_state(state);
            m.transfers.insert(id, t);
        }
        m
    }

    #[test]
    fn reap_removes_only_closed() {
        let m = manager_with(&[
            TransferState::Listening,
            TransferState::Streaming,
            TransferState::Closed,
            TransferState::Closed,
        ]);
        assert_eq!(m.reap(), 2);
        assert_eq!(m.transfers.len(), 2);
        assert_eq!(m.reap(), 0);
    }

    #[test]
    fn active_count_excludes_listening_and_closed() {
        let m = manager_with(&[
            TransferState::Listening,
            TransferState::Accepted,
            TransferState::Streaming,
            TransferState::Closed,
        ]);
        assert_eq!(m.active_count(), 2);
    }

    #[test]
    fn ids_are_never_reused() {
        let m = manager_with(&[TransferState::Closed, TransferState::Closed]);
        m.reap();
        assert_eq!(m.next_id(), 3);
    }

    #[tokio::test]
    async fn abort_half_closes_the_data_socket() {
        use crate::config::Config;
        use std::io::Write;
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpStream;

        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:6667"
            password = "pw"
            "#,
        )
        .unwrap();
        let engine = Arc::new(Engine::new(&config));
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let conn = engine.next_conn_id();
        engine.attach(conn, "127.0.0.1:40000".parse().unwrap(), tx);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[9u8; 64 * 1024]).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let dcc = offer(&engine, conn, "alice", "bob", &path).await.unwrap();
        let transfer = engine.transfers.get(1).unwrap();
        transfer.abort();

        // The streaming task observes the abort before its first chunk, so
        // the receiver sees a clean end of stream, not a reset mid-read.
        let mut sock = TcpStream::connect(("127.0.0.1", dcc.port)).await.unwrap();
        let mut buf = Vec::new();
        let n = sock.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);

        let notice = rx.recv().await.unwrap().to_string();
        assert!(notice.contains("failed: aborted"), "got: {notice}");
        assert!(transfer.is_closed());
    }
}
