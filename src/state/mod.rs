//! Shared server state: the Engine aggregate and its entities.

mod channel;
mod engine;
mod session;

pub use channel::Channel;
pub use engine::Engine;
pub use session::Session;

/// Opaque per-connection handle, stable for the connection's lifetime.
///
/// Allocated monotonically, so `BTreeSet<ConnId>` iteration follows accept
/// order, which is the deterministic broadcast order the protocol promises.
pub type ConnId = u64;

/// Handle for one file transfer. Monotonic, never reused; transfers are
/// keyed by this rather than by filename so two concurrent sends of files
/// with the same name cannot collide.
pub type TransferId = u64;
