//! Per-connection client state.

use crate::state::ConnId;
use std::net::SocketAddr;

/// State attached to one accepted control connection.
///
/// The registration ladder is strictly monotonic:
/// `Unauthenticated -> Authenticated -> Registered`. `registered` implies
/// `authenticated` at every observable instant; the only path to
/// registration runs through [`Session::try_register`], which requires it.
#[derive(Debug)]
pub struct Session {
    pub id: ConnId,
    pub addr: SocketAddr,
    pub nick: Option<String>,
    pub username: Option<String>,
    pub realname: Option<String>,
    pub authenticated: bool,
    registered: bool,
}

impl Session {
    pub fn new(id: ConnId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            nick: None,
            username: None,
            realname: None,
            authenticated: false,
            registered: false,
        }
    }

    pub fn registered(&self) -> bool {
        self.registered
    }

    /// Complete registration once both nick and username are present.
    /// Returns true exactly once, when the transition fires.
    pub fn try_register(&mut self) -> bool {
        if self.registered || !self.authenticated {
            return false;
        }
        if self.nick.is_some() && self.username.is_some() {
            self.registered = true;
            return true;
        }
        false
    }

    /// The client's current nick, or `*` before one is set.
    pub fn nick_or_star(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    /// Message prefix for lines originating from this client
    /// (`nick!user@localhost`).
    pub fn prefix(&self) -> String {
        format!(
            "{}!{}@localhost",
            self.nick.as_deref().unwrap_or(""),
            self.username.as_deref().unwrap_or(""),
        )
    }
}
