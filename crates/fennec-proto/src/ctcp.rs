//! CTCP delimiting and the `DCC SEND` handshake payload.
//!
//! DCC negotiation rides inside an ordinary PRIVMSG: the payload is
//! `\x01DCC SEND <filename> <ip-as-decimal> <port> <filesize>\x01`. The
//! server relays it verbatim; this module exists so the transfer subsystem
//! can build the offer and tests can take it apart again.

use std::fmt;
use std::net::Ipv4Addr;

/// The CTCP delimiter character.
pub const CTCP_DELIM: char = '\x01';

/// Whether a PRIVMSG payload is a CTCP message (e.g. a DCC handshake).
#[inline]
pub fn is_ctcp(text: &str) -> bool {
    text.starts_with(CTCP_DELIM)
}

/// A `DCC SEND` offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccSend {
    pub filename: String,
    pub addr: Ipv4Addr,
    pub port: u16,
    pub size: u64,
}

impl DccSend {
    /// Parse a PRIVMSG payload as a DCC SEND offer.
    ///
    /// Tolerates a missing trailing delimiter the same way CTCP parsers
    /// traditionally do.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);

        let mut parts = text.split_whitespace();
        if parts.next()? != "DCC" {
            return None;
        }
        if !parts.next()?.eq_ignore_ascii_case("SEND") {
            return None;
        }
        let filename = parts.next()?.to_string();
        let packed: u32 = parts.next()?.parse().ok()?;
        let port: u16 = parts.next()?.parse().ok()?;
        let size: u64 = parts.next()?.parse().ok()?;

        Some(Self {
            filename,
            addr: Ipv4Addr::from(packed),
            port,
            size,
        })
    }

    /// The address in packed decimal form, as it appears on the wire.
    pub fn packed_addr(&self) -> u32 {
        u32::from(self.addr)
    }
}

impl fmt::Display for DccSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{d}DCC SEND {} {} {} {}{d}",
            self.filename,
            self.packed_addr(),
            self.port,
            self.size,
            d = CTCP_DELIM,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_addr_is_big_endian_decimal() {
        let offer = DccSend {
            filename: "file.bin".into(),
            addr: Ipv4Addr::new(127, 0, 0, 1),
            port: 5000,
            size: 42,
        };
        assert_eq!(offer.packed_addr(), 2130706433);
        assert_eq!(
            offer.to_string(),
            "\x01DCC SEND file.bin 2130706433 5000 42\x01"
        );
    }

    #[test]
    fn parse_round_trip() {
        let offer = DccSend {
            filename: "big.tar".into(),
            addr: Ipv4Addr::new(10, 0, 0, 7),
            port: 40123,
            size: 10_485_760,
        };
        assert_eq!(DccSend::parse(&offer.to_string()).unwrap(), offer);
    }

    #[test]
    fn parse_tolerates_missing_trailing_delim() {
        let offer = DccSend::parse("\x01DCC SEND f 2130706433 6000 9").unwrap();
        assert_eq!(offer.port, 6000);
        assert_eq!(offer.size, 9);
    }

    #[test]
    fn parse_rejects_non_dcc() {
        assert!(DccSend::parse("hello").is_none());
        assert!(DccSend::parse("\x01ACTION waves\x01").is_none());
        assert!(DccSend::parse("\x01DCC CHAT chat 1 2\x01").is_none());
    }

    #[test]
    fn is_ctcp_checks_leading_delim() {
        assert!(is_ctcp("\x01DCC SEND f 1 2 3\x01"));
        assert!(!is_ctcp("DCC SEND f 1 2 3"));
    }
}
