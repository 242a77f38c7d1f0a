//! Command handlers.
//!
//! This module contains the Handler trait and command registry for
//! dispatching incoming control-channel messages. Each verb maps to one
//! handler; the registry applies the registration gate before the handler
//! runs, so individual handlers never re-check it.

mod auth;
mod cap;
mod channel;
mod dcc;
mod messaging;
mod mode;

pub use auth::{NickHandler, PassHandler, QuitHandler, UserHandler};
pub use cap::CapHandler;
pub use channel::{InviteHandler, JoinHandler, KickHandler, PartHandler, TopicHandler};
pub use dcc::DccHandler;
pub use messaging::PrivmsgHandler;
pub use mode::ModeHandler;

use crate::error::{CommandError, CommandResult};
use crate::state::{ConnId, Engine};
use async_trait::async_trait;
use fennec_proto::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// Handle of the connection that sent the command.
    pub conn: ConnId,
    /// Shared server state.
    pub engine: &'a Arc<Engine>,
    /// Outbound queue of the sending connection.
    pub sender: &'a mpsc::Sender<Message>,
}

impl Context<'_> {
    /// Queue a reply to the connection that sent the command.
    ///
    /// Never blocks: the queue is drained by the same select loop this
    /// handler runs under, so awaiting a full queue here could never make
    /// progress. A full queue drops the reply; a closed one ends the
    /// connection.
    pub fn reply(&self, msg: Message) -> CommandResult {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(conn = self.conn, "Outbound queue full, dropping reply");
                Ok(())
            }
            Err(TrySendError::Closed(msg)) => Err(CommandError::Send(mpsc::error::SendError(msg))),
        }
    }
}

/// Minimum registration progress a verb demands.
///
/// The gate is checked by the registry before dispatch. A verb that fails
/// its gate produces 464 (not yet authenticated) or 451 (authenticated but
/// not registered); the handler itself never runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Always allowed (CAP, PASS, QUIT).
    Open,
    /// Requires a successful PASS (NICK, USER).
    Authenticated,
    /// Requires full registration (everything else).
    Registered,
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The registration gate for this verb.
    fn gate(&self) -> Gate {
        Gate::Registered
    }

    /// Handle an incoming message. The gate has already been enforced.
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult;
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("CAP", Box::new(CapHandler));
        handlers.insert("PASS", Box::new(PassHandler));
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("USER", Box::new(UserHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("TOPIC", Box::new(TopicHandler));
        handlers.insert("KICK", Box::new(KickHandler));
        handlers.insert("INVITE", Box::new(InviteHandler));
        handlers.insert("MODE", Box::new(ModeHandler));

        // Messaging and transfers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("DCC", Box::new(DccHandler));

        Self { handlers }
    }

    /// Dispatch one message: uppercase the verb, enforce its gate, then run
    /// the handler.
    ///
    /// Unknown verbs are gated like registered-only commands, so an
    /// unauthenticated client probing random verbs sees 464, a half-registered
    /// one sees 451, and only a registered client gets 421.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let verb = msg.command.to_ascii_uppercase();
        let handler = self.handlers.get(verb.as_str());
        let gate = handler.map_or(Gate::Registered, |h| h.gate());

        if gate != Gate::Open {
            let session = ctx
                .engine
                .session(ctx.conn)
                .ok_or(CommandError::NotRegistered)?;
            let session = session.read().await;
            if !session.authenticated {
                return Err(CommandError::PasswdMismatch);
            }
            if gate == Gate::Registered && !session.registered() {
                return Err(CommandError::NotRegistered);
            }
        }

        match handler {
            Some(h) => h.handle(ctx, msg).await,
            None => Err(CommandError::UnknownCommand(verb)),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::net::SocketAddr;

    pub(crate) fn test_engine() -> Arc<Engine> {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:6667"
            password = "pw"
            "#,
        )
        .unwrap();
        Arc::new(Engine::new(&config))
    }

    pub(crate) fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Attach a connection and return its id plus the receive side of its
    /// outbound queue.
    pub(crate) fn attach(engine: &Arc<Engine>) -> (ConnId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(64);
        let id = engine.next_conn_id();
        engine.attach(id, test_addr(), tx);
        (id, rx)
    }

    /// Drive a session straight to the registered state.
    pub(crate) async fn register(engine: &Arc<Engine>, id: ConnId, nick: &str) {
        let session = engine.session(id).unwrap();
        let mut session = session.write().await;
        session.authenticated = true;
        session.nick = Some(nick.to_string());
        session.username = Some(nick.to_string());
        assert!(session.try_register());
        drop(session);
        assert!(engine.claim_nick(id, nick));
    }

    #[tokio::test]
    async fn unauthenticated_verbs_hit_the_password_gate() {
        let engine = test_engine();
        let registry = Registry::new();
        let (id, _rx) = attach(&engine);
        let (tx, _tx_rx) = mpsc::channel(8);
        let mut ctx = Context {
            conn: id,
            engine: &engine,
            sender: &tx,
        };

        for line in ["NICK bob", "JOIN #c", "BOGUS"] {
            let msg = Message::parse(line).unwrap();
            let err = registry.dispatch(&mut ctx, &msg).await.unwrap_err();
            assert!(matches!(err, CommandError::PasswdMismatch), "{line}");
        }
    }

    #[tokio::test]
    async fn authenticated_but_unregistered_sees_451() {
        let engine = test_engine();
        let registry = Registry::new();
        let (id, _rx) = attach(&engine);
        engine
            .session(id)
            .unwrap()
            .write()
            .await
            .authenticated = true;
        let (tx, _tx_rx) = mpsc::channel(8);
        let mut ctx = Context {
            conn: id,
            engine: &engine,
            sender: &tx,
        };

        for line in ["JOIN #c", "PRIVMSG bob :hi", "BOGUS"] {
            let msg = Message::parse(line).unwrap();
            let err = registry.dispatch(&mut ctx, &msg).await.unwrap_err();
            assert!(matches!(err, CommandError::NotRegistered), "{line}");
        }
    }

    #[tokio::test]
    async fn unknown_verb_after_registration_is_421() {
        let engine = test_engine();
        let registry = Registry::new();
        let (id, _rx) = attach(&engine);
        register(&engine, id, "bob").await;
        let (tx, _tx_rx) = mpsc::channel(8);
        let mut ctx = Context {
            conn: id,
            engine: &engine,
            sender: &tx,
        };

        let msg = Message::parse("bogus").unwrap();
        let err = registry.dispatch(&mut ctx, &msg).await.unwrap_err();
        match err {
            CommandError::UnknownCommand(verb) => assert_eq!(verb, "BOGUS"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
