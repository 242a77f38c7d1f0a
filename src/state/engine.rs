//! The Engine - central shared state for the server.
//!
//! The Engine owns every registry: sessions, outbound senders, channels, the
//! nick index, and the active-transfer table. All of it lives in concurrent
//! maps accessible from any connection task; there is no ambient global
//! state.

use crate::config::{Config, TransferConfig};
use crate::state::{Channel, ConnId, Session};
use crate::transfer::TransferManager;
use dashmap::{DashMap, Entry};
use fennec_proto::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// Central state container.
pub struct Engine {
    /// All live connections, indexed by handle.
    pub sessions: DashMap<ConnId, Arc<RwLock<Session>>>,

    /// Outbound queue handle per connection, for message routing.
    pub senders: DashMap<ConnId, mpsc::Sender<Message>>,

    /// All channels, indexed by name. A channel with zero members is never
    /// left in this map.
    pub channels: DashMap<String, Arc<RwLock<Channel>>>,

    /// Nick to connection mapping; enforces nick uniqueness.
    pub nicks: DashMap<String, ConnId>,

    /// Active file transfers.
    pub transfers: TransferManager,

    /// Connection password expected from PASS.
    pub password: String,

    /// Transfer tuning, read by the DCC subsystem.
    pub transfer_config: TransferConfig,

    conn_seq: AtomicU64,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: DashMap::new(),
            senders: DashMap::new(),
            channels: DashMap::new(),
            nicks: DashMap::new(),
            transfers: TransferManager::new(),
            password: config.server.password.clone(),
            transfer_config: config.transfer.clone(),
            conn_seq: AtomicU64::new(1),
        }
    }

    /// Allocate the handle for a newly accepted connection.
    pub fn next_conn_id(&self) -> ConnId {
        self.conn_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a freshly accepted connection and its outbound queue.
    pub fn attach(&self, id: ConnId, addr: SocketAddr, tx: mpsc::Sender<Message>) {
        self.sessions
            .insert(id, Arc::new(RwLock::new(Session::new(id, addr))));
        self.senders.insert(id, tx);
    }

    /// Tear down a connection: drop it from every channel (destroying
    /// channels it leaves empty), release its nick, session, and sender.
    pub async fn detach(&self, id: ConnId) {
        let names: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        for name in names {
            let Some(chan_arc) = self.channels.get(&name).map(|e| e.value().clone()) else {
                continue;
            };
            let mut chan = chan_arc.write().await;
            if chan.is_member(id) {
                chan.remove_member(id);
                if chan.is_empty() {
                    drop(chan);
                    self.channels.remove(&name);
                    debug!(channel = %name, "Channel destroyed (last member left)");
                }
            }
        }

        if let Some(session) = self.sessions.remove(&id).map(|(_, s)| s) {
            let session = session.read().await;
            if let Some(nick) = &session.nick {
                self.nicks.remove(nick);
                debug!(nick = %nick, "Nick released");
            }
        }
        self.senders.remove(&id);
    }

    pub fn session(&self, id: ConnId) -> Option<Arc<RwLock<Session>>> {
        self.sessions.get(&id).map(|e| e.value().clone())
    }

    pub fn channel(&self, name: &str) -> Option<Arc<RwLock<Channel>>> {
        self.channels.get(name).map(|e| e.value().clone())
    }

    /// Drop a channel from the registry if its member set is empty.
    pub async fn remove_channel_if_empty(&self, name: &str) {
        if let Some(chan_arc) = self.channel(name) {
            let chan = chan_arc.read().await;
            if chan.is_empty() {
                drop(chan);
                self.channels.remove(name);
                debug!(channel = %name, "Channel destroyed (last member left)");
            }
        }
    }

    pub fn conn_by_nick(&self, nick: &str) -> Option<ConnId> {
        self.nicks.get(nick).map(|e| *e.value())
    }

    /// Atomically claim `nick` for `id` in the nick index.
    ///
    /// The claim-or-fail is a single entry operation, so two connections
    /// racing for the same nick can never both win. Re-claiming a nick one
    /// already holds succeeds.
    pub fn claim_nick(&self, id: ConnId, nick: &str) -> bool {
        match self.nicks.entry(nick.to_string()) {
            Entry::Occupied(e) => *e.get() == id,
            Entry::Vacant(e) => {
                e.insert(id);
                true
            }
        }
    }

    /// Release a nick from the index, e.g. after a nick change.
    pub fn release_nick(&self, nick: &str) {
        self.nicks.remove(nick);
    }

    /// Queue a message on one connection's outbound buffer.
    ///
    /// Never blocks. A full queue means the peer has stopped draining its
    /// socket; the message is dropped so a stalled reader cannot wedge the
    /// handler (and any lock it holds) that is routing to it. A closed queue
    /// means the peer is already tearing down.
    pub fn send_to(&self, id: ConnId, msg: Message) {
        let Some(tx) = self.senders.get(&id).map(|e| e.value().clone()) else {
            return;
        };
        match tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(conn = id, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = id, "Dropped message for departing connection");
            }
        }
    }

    /// Deliver one message to a list of members, in the order given.
    pub fn broadcast(&self, targets: &[ConnId], msg: &Message, exclude: Option<ConnId>) {
        for &id in targets {
            if Some(id) == exclude {
                continue;
            }
            self.send_to(id, msg.clone());
        }
    }

    /// The `nick!user@localhost` prefix for a connection.
    pub async fn prefix_of(&self, id: ConnId) -> Option<String> {
        let session = self.session(id)?;
        let session = session.read().await;
        Some(session.prefix())
    }

    pub async fn nick_of(&self, id: ConnId) -> Option<String> {
        let session = self.session(id)?;
        let session = session.read().await;
        session.nick.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:6667"
            password = "pw"
            "#,
        )
        .unwrap();
        Engine::new(&config)
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn detach_releases_nick_and_sender() {
        let engine = engine();
        let (tx, _rx) = mpsc::channel(8);
        let id = engine.next_conn_id();
        engine.attach(id, addr(), tx);

        {
            let session = engine.session(id).unwrap();
            session.write().await.nick = Some("bob".into());
        }
        assert!(engine.claim_nick(id, "bob"));
        assert_eq!(engine.conn_by_nick("bob"), Some(id));

        engine.detach(id).await;
        assert!(engine.conn_by_nick("bob").is_none());
        assert!(engine.session(id).is_none());
        assert!(engine.senders.get(&id).is_none());
    }

    #[tokio::test]
    async fn detach_destroys_emptied_channels() {
        let engine = engine();
        let (tx, _rx) = mpsc::channel(8);
        let id = engine.next_conn_id();
        engine.attach(id, addr(), tx);

        let chan = Arc::new(RwLock::new(Channel::new("#solo".into())));
        chan.write().await.add_member(id);
        engine.channels.insert("#solo".into(), chan);

        engine.detach(id).await;
        assert!(engine.channel("#solo").is_none());
    }

    #[tokio::test]
    async fn detach_keeps_populated_channels() {
        let engine = engine();
        let (tx_a, _rx_a) = mpsc::channel(8);
        let (tx_b, _rx_b) = mpsc::channel(8);
        let a = engine.next_conn_id();
        let b = engine.next_conn_id();
        engine.attach(a, addr(), tx_a);
        engine.attach(b, addr(), tx_b);

        let chan = Arc::new(RwLock::new(Channel::new("#pair".into())));
        {
            let mut c = chan.write().await;
            c.add_member(a);
            c.add_member(b);
            c.add_operator(a);
        }
        engine.channels.insert("#pair".into(), chan);

        engine.detach(a).await;
        let chan = engine.channel("#pair").expect("channel should survive");
        let chan = chan.read().await;
        assert!(chan.is_member(b));
        assert!(!chan.is_member(a));
        assert!(!chan.is_operator(a));
    }

    #[tokio::test]
    async fn claim_nick_is_first_wins() {
        let engine = engine();
        let a = engine.next_conn_id();
        let b = engine.next_conn_id();
        assert!(engine.claim_nick(a, "bob"));
        assert!(!engine.claim_nick(b, "bob"));
        // Re-claiming one's own nick is fine
        assert!(engine.claim_nick(a, "bob"));
        assert!(engine.claim_nick(b, "carol"));

        engine.release_nick("bob");
        assert!(engine.claim_nick(b, "bob"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_claims_yield_exactly_one_owner() {
        let engine = Arc::new(engine());
        let mut claims = Vec::new();
        for id in 1..=8u64 {
            let engine = Arc::clone(&engine);
            claims.push(tokio::spawn(async move { engine.claim_nick(id, "bob") }));
        }
        let mut wins = 0;
        for claim in claims {
            if claim.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn send_to_drops_when_the_queue_is_full() {
        let engine = engine();
        let (tx, mut rx) = mpsc::channel(2);
        let id = engine.next_conn_id();
        engine.attach(id, addr(), tx);

        // Three sends into a depth-2 queue: the third returns without
        // blocking and the message is dropped.
        for _ in 0..3 {
            engine.send_to(id, Message::new("server", "PING", vec![]));
        }
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
