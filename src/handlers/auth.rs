//! Connection registration: PASS, NICK, USER, QUIT.
//!
//! Registration is a strict ladder. PASS authenticates the connection,
//! NICK and USER each fill in their half, and whichever lands second
//! completes registration and triggers the welcome burst.

use crate::error::{CommandError, CommandResult};
use crate::handlers::{Context, Gate, Handler};
use async_trait::async_trait;
use fennec_proto::{Message, Response};
use tracing::info;

/// 001 through 004, sent exactly once when registration completes.
fn send_welcome(ctx: &Context<'_>, nick: &str) -> CommandResult {
    ctx.reply(Response::rpl_welcome(nick))?;
    ctx.reply(Response::rpl_yourhost(nick))?;
    ctx.reply(Response::rpl_created(nick))?;
    ctx.reply(Response::rpl_myinfo(nick))
}

pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    fn gate(&self) -> Gate {
        Gate::Open
    }

    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let session = ctx
            .engine
            .session(ctx.conn)
            .ok_or(CommandError::NotRegistered)?;
        let mut session = session.write().await;

        if session.registered() {
            return Err(CommandError::AlreadyRegistered);
        }
        let supplied = match msg.arg(0) {
            Some(p) if !p.is_empty() => p,
            _ => return Err(CommandError::NeedMoreParams("PASS".into())),
        };
        if supplied != ctx.engine.password {
            return Err(CommandError::PasswdMismatch);
        }
        session.authenticated = true;
        info!(conn = ctx.conn, "Connection authenticated");
        Ok(())
    }
}

pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    fn gate(&self) -> Gate {
        Gate::Authenticated
    }

    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(attempted) = msg.arg(0) else {
            return Err(CommandError::NoNicknameGiven);
        };
        let attempted = attempted.to_string();

        let session = ctx
            .engine
            .session(ctx.conn)
            .ok_or(CommandError::NotRegistered)?;
        let mut session = session.write().await;

        // Claim-or-fail is atomic on the nick index, so two connections
        // racing for the same nick cannot both pass a separate check.
        if !ctx.engine.claim_nick(ctx.conn, &attempted) {
            return Err(CommandError::NicknameInUse {
                current: session.nick_or_star().to_string(),
                attempted,
            });
        }

        let old = session.nick.replace(attempted.clone());
        if let Some(old) = &old {
            if *old != attempted {
                ctx.engine.release_nick(old);
            }
        }

        // A nick change is echoed to the client itself; nobody else is told.
        if let Some(old) = old {
            let change = Message::with_trailing(&old, "NICK", vec![], &attempted);
            ctx.reply(change)?;
        }

        if session.try_register() {
            info!(conn = ctx.conn, nick = %attempted, "Client registered");
            send_welcome(ctx, &attempted)?;
        }
        Ok(())
    }
}

pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    fn gate(&self) -> Gate {
        Gate::Authenticated
    }

    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        if msg.params.len() < 4 {
            return Err(CommandError::NeedMoreParams("USER".into()));
        }

        let session = ctx
            .engine
            .session(ctx.conn)
            .ok_or(CommandError::NotRegistered)?;
        let mut session = session.write().await;

        if session.registered() {
            return Err(CommandError::AlreadyRegistered);
        }
        session.username = Some(msg.params[0].clone());
        session.realname = Some(msg.params[3].clone());

        if session.try_register() {
            let nick = session.nick_or_star().to_string();
            info!(conn = ctx.conn, nick = %nick, "Client registered");
            send_welcome(ctx, &nick)?;
        }
        Ok(())
    }
}

pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    fn gate(&self) -> Gate {
        Gate::Open
    }

    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let reason = msg.arg(0).unwrap_or("Client quit").to_string();

        // Announce to every channel the client is in. Membership itself is
        // torn down by the connection loop via Engine::detach.
        if let Some(prefix) = ctx.engine.prefix_of(ctx.conn).await {
            let line = Message::with_trailing(&prefix, "QUIT", vec![], &reason);
            let names: Vec<String> = ctx
                .engine
                .channels
                .iter()
                .map(|e| e.key().clone())
                .collect();
            for name in names {
                let Some(chan) = ctx.engine.channel(&name) else {
                    continue;
                };
                let members = {
                    let chan = chan.read().await;
                    if !chan.is_member(ctx.conn) {
                        continue;
                    }
                    chan.member_ids()
                };
                ctx.engine.broadcast(&members, &line, Some(ctx.conn));
            }
        }

        Err(CommandError::Quit(Some(reason)))
    }
}
