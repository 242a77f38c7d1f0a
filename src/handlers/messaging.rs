//! PRIVMSG delivery to channels and nicks.

use crate::error::{CommandError, CommandResult};
use crate::handlers::{Context, Handler};
use async_trait::async_trait;
use fennec_proto::Message;

pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        if msg.params.len() < 2 {
            return Err(CommandError::NoRecipient("PRIVMSG".into()));
        }
        let target = msg.params[0].as_str();
        let text = msg.params[1].as_str();

        let prefix = ctx
            .engine
            .prefix_of(ctx.conn)
            .await
            .ok_or(CommandError::NotRegistered)?;
        // CTCP payloads (\x01-framed) ride through untouched; the text is
        // relayed verbatim either way.
        let line =
            Message::with_trailing(&prefix, "PRIVMSG", vec![target.to_string()], text);

        if target.starts_with('#') {
            let chan_arc = ctx
                .engine
                .channel(target)
                .ok_or_else(|| CommandError::NoSuchChannel(target.to_string()))?;
            let chan = chan_arc.read().await;
            if !chan.is_member(ctx.conn) {
                return Err(CommandError::CannotSendToChan(target.to_string()));
            }
            let members = chan.member_ids();
            drop(chan);
            ctx.engine.broadcast(&members, &line, Some(ctx.conn));
        } else {
            let peer = ctx
                .engine
                .conn_by_nick(target)
                .ok_or_else(|| CommandError::NoSuchNick(target.to_string()))?;
            ctx.engine.send_to(peer, line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::JoinHandler;
    use crate::handlers::tests::{attach, register, test_engine};
    use crate::state::{ConnId, Engine};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn run(
        engine: &Arc<Engine>,
        handler: &dyn Handler,
        conn: ConnId,
        tx: &mpsc::Sender<Message>,
        line: &str,
    ) -> CommandResult {
        let mut ctx = Context {
            conn,
            engine,
            sender: tx,
        };
        let msg = Message::parse(line).unwrap();
        handler.handle(&mut ctx, &msg).await
    }

    async fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.to_string());
        }
        out
    }

    #[tokio::test]
    async fn channel_message_excludes_the_sender() {
        let engine = test_engine();
        let (alice, mut rx_a) = attach(&engine);
        let (bob, mut rx_b) = attach(&engine);
        register(&engine, alice, "alice").await;
        register(&engine, bob, "bob").await;
        let (tx, _tx_rx) = mpsc::channel(16);

        run(&engine, &JoinHandler, alice, &tx, "JOIN #chat").await.unwrap();
        run(&engine, &JoinHandler, bob, &tx, "JOIN #chat").await.unwrap();
        drain(&mut rx_a).await;
        drain(&mut rx_b).await;

        run(&engine, &PrivmsgHandler, alice, &tx, "PRIVMSG #chat :hello all")
            .await
            .unwrap();
        assert_eq!(
            drain(&mut rx_b).await,
            vec![":alice!alice@localhost PRIVMSG #chat :hello all"]
        );
        assert!(drain(&mut rx_a).await.is_empty());
    }

    #[tokio::test]
    async fn direct_message_reaches_only_the_target() {
        let engine = test_engine();
        let (alice, mut rx_a) = attach(&engine);
        let (bob, mut rx_b) = attach(&engine);
        register(&engine, alice, "alice").await;
        register(&engine, bob, "bob").await;
        let (tx, _tx_rx) = mpsc::channel(16);

        run(&engine, &PrivmsgHandler, alice, &tx, "PRIVMSG bob :psst")
            .await
            .unwrap();
        assert_eq!(
            drain(&mut rx_b).await,
            vec![":alice!alice@localhost PRIVMSG bob :psst"]
        );
        assert!(drain(&mut rx_a).await.is_empty());
    }

    #[tokio::test]
    async fn messaging_a_channel_from_outside_is_rejected() {
        let engine = test_engine();
        let (alice, _rx_a) = attach(&engine);
        let (bob, _rx_b) = attach(&engine);
        register(&engine, alice, "alice").await;
        register(&engine, bob, "bob").await;
        let (tx, _tx_rx) = mpsc::channel(16);

        run(&engine, &JoinHandler, alice, &tx, "JOIN #chat").await.unwrap();
        let err = run(&engine, &PrivmsgHandler, bob, &tx, "PRIVMSG #chat :hi")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::CannotSendToChan(_)));
    }

    #[tokio::test]
    async fn missing_text_reports_norecipient() {
        let engine = test_engine();
        let (alice, _rx_a) = attach(&engine);
        register(&engine, alice, "alice").await;
        let (tx, _tx_rx) = mpsc::channel(16);

        let err = run(&engine, &PrivmsgHandler, alice, &tx, "PRIVMSG bob")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NoRecipient(cmd) if cmd == "PRIVMSG"));

        let err = run(&engine, &PrivmsgHandler, alice, &tx, "PRIVMSG ghost :hi")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NoSuchNick(nick) if nick == "ghost"));
    }

    #[tokio::test]
    async fn ctcp_payload_is_relayed_verbatim() {
        let engine = test_engine();
        let (alice, _rx_a) = attach(&engine);
        let (bob, mut rx_b) = attach(&engine);
        register(&engine, alice, "alice").await;
        register(&engine, bob, "bob").await;
        let (tx, _tx_rx) = mpsc::channel(16);

        run(
            &engine,
            &PrivmsgHandler,
            alice,
            &tx,
            "PRIVMSG bob :\x01DCC SEND f.bin 2130706433 5000 42\x01",
        )
        .await
        .unwrap();
        assert_eq!(
            drain(&mut rx_b).await,
            vec![":alice!alice@localhost PRIVMSG bob :\x01DCC SEND f.bin 2130706433 5000 42\x01"]
        );
    }
}
