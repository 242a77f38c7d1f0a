//! # fennec-proto
//!
//! Wire protocol for the Fennec IRC daemon.
//!
//! - Tolerant line-oriented message parsing (`\r\n` or bare `\n`, trailing
//!   parameter syntax with embedded whitespace)
//! - A [`LineCodec`] for framing messages over a TCP stream
//! - The numeric reply catalog ([`Response`]), reproduced byte-for-byte for
//!   interoperability with existing IRC clients
//! - CTCP delimiting and the `DCC SEND` handshake payload

pub mod codec;
pub mod ctcp;
pub mod message;
pub mod response;

pub use self::codec::{CodecError, LineCodec};
pub use self::ctcp::{CTCP_DELIM, DccSend, is_ctcp};
pub use self::message::Message;
pub use self::response::Response;
