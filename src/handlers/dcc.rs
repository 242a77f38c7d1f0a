//! DCC SEND initiation.
//!
//! `DCC SEND <filename> <nick>` sets up a server-hosted transfer: the file
//! is opened, an ephemeral listener bound, and the CTCP offer delivered to
//! the target as an ordinary private message. The byte stream itself never
//! touches the control channel.

use crate::error::{CommandError, CommandResult};
use crate::handlers::{Context, Handler};
use crate::transfer;
use async_trait::async_trait;
use fennec_proto::{Message, Response};
use tracing::warn;

/// The one non-numeric rejection in the protocol, sent for a DCC line whose
/// subcommand is not SEND.
fn invalid_syntax() -> Message {
    Message {
        prefix: None,
        command: "ERROR".into(),
        params: vec![],
        trailing: Some("Invalid DCC SEND syntax".into()),
    }
}

pub struct DccHandler;

#[async_trait]
impl Handler for DccHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(subcommand) = msg.arg(0) else {
            return Err(CommandError::NeedMoreParams("DCC".into()));
        };
        if !subcommand.eq_ignore_ascii_case("SEND") {
            return ctx.reply(invalid_syntax());
        }
        let (Some(filename), Some(target_nick)) = (msg.arg(1), msg.arg(2)) else {
            return Err(CommandError::NeedMoreParams("DCC".into()));
        };

        let target = ctx
            .engine
            .conn_by_nick(target_nick)
            .ok_or_else(|| CommandError::NoSuchNick(target_nick.to_string()))?;
        let sender_nick = ctx
            .engine
            .nick_of(ctx.conn)
            .await
            .ok_or(CommandError::NotRegistered)?;

        let offer =
            match transfer::offer(ctx.engine, ctx.conn, &sender_nick, target_nick, filename)
                .await
            {
                Ok(offer) => offer,
                Err(e) => {
                    // No transfer object survives a failed setup.
                    warn!(conn = ctx.conn, file = %filename, error = %e, "Transfer setup failed");
                    return ctx.reply(Response::notice(
                        &sender_nick,
                        format!("DCC SEND {filename} failed: {e}"),
                    ));
                }
            };

        let prefix = ctx
            .engine
            .prefix_of(ctx.conn)
            .await
            .ok_or(CommandError::NotRegistered)?;
        let port = offer.port;
        let handshake = Message::with_trailing(
            &prefix,
            "PRIVMSG",
            vec![target_nick.to_string()],
            offer.to_string(),
        );
        ctx.engine.send_to(target, handshake);

        ctx.reply(Response::notice(
            &sender_nick,
            format!("DCC SEND initiated for {filename} on port {port}"),
        ))
    }
}
