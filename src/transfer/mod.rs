//! Out-of-band DCC file transfers.
//!
//! A transfer is negotiated over the control channel (the `DCC SEND` verb)
//! but moves bytes over its own ephemeral TCP socket. Each active transfer
//! runs in its own task: wait for the receiver to claim the offer, then
//! stream the file in fixed-size chunks. The manager keeps the table of
//! live transfers; a periodic sweep reaps the ones that have closed.

mod manager;
mod task;

pub use manager::{TransferManager, offer};

use crate::state::{ConnId, TransferId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lifecycle of one transfer. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Listener bound, waiting for the receiver to connect.
    Listening,
    /// Receiver connected; listener closed.
    Accepted,
    /// File bytes moving.
    Streaming,
    /// Both sockets and the file are closed. Reapable.
    Closed,
}

/// One outbound file transfer.
///
/// `bytes_sent` is monotone and never exceeds `size`; the streaming task is
/// the only writer. The sockets and file handle are owned by the task, so
/// external abort is a flag the task honors between chunks.
#[derive(Debug)]
pub struct Transfer {
    pub id: TransferId,
    pub filename: String,
    pub sender_nick: String,
    pub receiver_nick: String,
    /// Control connection of the initiator, for failure notices.
    pub sender_conn: ConnId,
    pub size: u64,
    bytes_sent: AtomicU64,
    state: Mutex<TransferState>,
    abort_requested: AtomicBool,
}

impl Transfer {
    fn new(
        id: TransferId,
        filename: String,
        sender_nick: String,
        receiver_nick: String,
        sender_conn: ConnId,
        size: u64,
    ) -> Self {
        Self {
            id,
            filename,
            sender_nick,
            receiver_nick,
            sender_conn,
            size,
            bytes_sent: AtomicU64::new(0),
            state: Mutex::new(TransferState::Listening),
            abort_requested: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> TransferState {
        *self.state.lock()
    }

    fn set_state(&self, state: TransferState) {
        *self.state.lock() = state;
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Acquire)
    }

    fn add_sent(&self, n: u64) {
        let total = self.bytes_sent.fetch_add(n, Ordering::AcqRel) + n;
        debug_assert!(total <= self.size);
    }

    /// Whether a data socket is currently open.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            TransferState::Accepted | TransferState::Streaming
        )
    }

    pub fn is_closed(&self) -> bool {
        self.state() == TransferState::Closed
    }

    /// Percentage of the file delivered so far. Never exceeds 100.
    pub fn progress(&self) -> u8 {
        if self.size == 0 {
            return if self.is_closed() { 100 } else { 0 };
        }
        let pct = self.bytes_sent() * 100 / self.size;
        pct.min(100) as u8
    }

    /// Ask the streaming task to stop. Idempotent; safe to call in any
    /// state. The task closes the sockets and the file on its way out.
    pub fn abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }
}
