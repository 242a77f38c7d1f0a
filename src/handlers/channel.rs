//! Channel lifecycle: JOIN, PART, TOPIC, KICK, INVITE.

use crate::error::{CommandError, CommandResult};
use crate::handlers::{Context, Handler};
use crate::state::Channel;
use async_trait::async_trait;
use fennec_proto::{Message, Response};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Look up a channel or fail with the no-such-channel reply.
async fn require_channel(
    ctx: &Context<'_>,
    name: &str,
) -> Result<Arc<RwLock<Channel>>, CommandError> {
    ctx.engine
        .channel(name)
        .ok_or_else(|| CommandError::NoSuchChannel(name.to_string()))
}

/// The caller's `nick!user@localhost` prefix. Registered connections always
/// have one.
async fn require_prefix(ctx: &Context<'_>) -> Result<String, CommandError> {
    ctx.engine
        .prefix_of(ctx.conn)
        .await
        .ok_or(CommandError::NotRegistered)
}

async fn require_nick(ctx: &Context<'_>) -> Result<String, CommandError> {
    ctx.engine
        .nick_of(ctx.conn)
        .await
        .ok_or(CommandError::NotRegistered)
}

pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(name) = msg.arg(0) else {
            return Err(CommandError::NeedMoreParams("JOIN".into()));
        };
        if !name.starts_with('#') {
            return Err(CommandError::NoSuchChannel(name.to_string()));
        }
        let supplied_key = msg.arg(1).unwrap_or("");

        let (chan_arc, created) = match ctx.engine.channel(name) {
            Some(chan) => (chan, false),
            None => {
                let chan = Arc::new(RwLock::new(Channel::new(name.to_string())));
                ctx.engine.channels.insert(name.to_string(), chan.clone());
                info!(channel = %name, "Channel created");
                (chan, true)
            }
        };

        let mut chan = chan_arc.write().await;
        if chan.is_member(ctx.conn) {
            // Joining twice is a silent no-op.
            return Ok(());
        }
        if chan.invite_only && !chan.is_invited(ctx.conn) {
            return Err(CommandError::InviteOnlyChan(name.to_string()));
        }
        if chan.key.as_deref().is_some_and(|key| key != supplied_key) {
            return Err(CommandError::BadChannelKey(name.to_string()));
        }
        if chan.is_full() {
            return Err(CommandError::ChannelIsFull(name.to_string()));
        }

        chan.add_member(ctx.conn);
        if created {
            chan.add_operator(ctx.conn);
        }

        let members = chan.member_ids();
        let topic = chan.topic.clone();

        // Names listing: operators marked with @, each name followed by a
        // space, in member order.
        let mut names = String::new();
        for id in chan.members() {
            if chan.is_operator(id) {
                names.push('@');
            }
            if let Some(nick) = ctx.engine.nick_of(id).await {
                names.push_str(&nick);
            }
            names.push(' ');
        }
        drop(chan);

        let prefix = require_prefix(ctx).await?;
        let join = Message::new(&prefix, "JOIN", vec![name.to_string()]);
        ctx.engine.broadcast(&members, &join, None);

        let nick = require_nick(ctx).await?;
        if topic.is_empty() {
            ctx.reply(Response::rpl_notopic(&nick, name))?;
        } else {
            ctx.reply(Response::rpl_topic(&nick, name, &topic))?;
        }
        ctx.reply(Response::rpl_namreply(&nick, name, &names))?;
        ctx.reply(Response::rpl_endofnames(&nick, name))
    }
}

pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(name) = msg.arg(0) else {
            return Err(CommandError::NeedMoreParams("PART".into()));
        };
        let reason = msg.arg(1).unwrap_or("Leaving");

        let chan_arc = require_channel(ctx, name).await?;
        let mut chan = chan_arc.write().await;
        if !chan.is_member(ctx.conn) {
            return Err(CommandError::NotOnChannel(name.to_string()));
        }

        // The pre-removal member list keeps the leaver in the audience; the
        // lock is released before any fan-out.
        let members = chan.member_ids();
        chan.remove_member(ctx.conn);
        drop(chan);

        let prefix = require_prefix(ctx).await?;
        let part = Message::with_trailing(&prefix, "PART", vec![name.to_string()], reason);
        ctx.engine.broadcast(&members, &part, None);
        ctx.engine.remove_channel_if_empty(name).await;
        Ok(())
    }
}

pub struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(name) = msg.arg(0) else {
            return Err(CommandError::NeedMoreParams("TOPIC".into()));
        };

        let chan_arc = require_channel(ctx, name).await?;
        let mut chan = chan_arc.write().await;
        if !chan.is_member(ctx.conn) {
            return Err(CommandError::NotOnChannel(name.to_string()));
        }

        // View
        let Some(new_topic) = msg.arg(1) else {
            let nick = require_nick(ctx).await?;
            let reply = if chan.topic.is_empty() {
                Response::rpl_notopic(&nick, name)
            } else {
                Response::rpl_topic(&nick, name, &chan.topic)
            };
            return ctx.reply(reply);
        };

        // Set
        if chan.topic_restricted && !chan.is_operator(ctx.conn) {
            return Err(CommandError::ChanOpPrivsNeeded(name.to_string()));
        }
        chan.topic = new_topic.to_string();

        let members = chan.member_ids();
        drop(chan);

        let prefix = require_prefix(ctx).await?;
        let notice = Message::with_trailing(&prefix, "TOPIC", vec![name.to_string()], new_topic);
        ctx.engine.broadcast(&members, &notice, None);
        Ok(())
    }
}

pub struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let (Some(name), Some(target_nick)) = (msg.arg(0), msg.arg(1)) else {
            return Err(CommandError::NeedMoreParams("KICK".into()));
        };
        let reason = msg.arg(2).unwrap_or("Kicked");

        let chan_arc = require_channel(ctx, name).await?;
        let mut chan = chan_arc.write().await;
        if !chan.is_operator(ctx.conn) {
            return Err(CommandError::ChanOpPrivsNeeded(name.to_string()));
        }

        let target = ctx.engine.conn_by_nick(target_nick);
        let Some(target) = target.filter(|&id| chan.is_member(id)) else {
            return Err(CommandError::UserNotInChannel {
                nick: target_nick.to_string(),
                channel: name.to_string(),
            });
        };

        // The victim stays in the pre-removal member list, so they see their
        // own removal; the lock is released before any fan-out.
        let members = chan.member_ids();
        chan.remove_member(target);
        drop(chan);

        let prefix = require_prefix(ctx).await?;
        let kick = Message::with_trailing(
            &prefix,
            "KICK",
            vec![name.to_string(), target_nick.to_string()],
            reason,
        );
        ctx.engine.broadcast(&members, &kick, None);
        info!(channel = %name, nick = %target_nick, "Member kicked");
        Ok(())
    }
}

pub struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let (Some(target_nick), Some(name)) = (msg.arg(0), msg.arg(1)) else {
            return Err(CommandError::NeedMoreParams("INVITE".into()));
        };

        let chan_arc = require_channel(ctx, name).await?;
        let mut chan = chan_arc.write().await;
        if !chan.is_member(ctx.conn) {
            return Err(CommandError::NotOnChannel(name.to_string()));
        }
        // On invite-only channels, only operators may extend invites.
        if chan.invite_only && !chan.is_operator(ctx.conn) {
            return Err(CommandError::ChanOpPrivsNeeded(name.to_string()));
        }

        let Some(target) = ctx.engine.conn_by_nick(target_nick) else {
            return Err(CommandError::NoSuchNick(target_nick.to_string()));
        };
        if chan.is_member(target) {
            return Err(CommandError::UserOnChannel {
                nick: target_nick.to_string(),
                channel: name.to_string(),
            });
        }

        chan.add_invite(target);
        drop(chan);

        let nick = require_nick(ctx).await?;
        ctx.reply(Response::rpl_inviting(&nick, target_nick, name))?;

        let prefix = require_prefix(ctx).await?;
        let invite = Message::with_trailing(
            &prefix,
            "INVITE",
            vec![target_nick.to_string()],
            name,
        );
        ctx.engine.send_to(target, invite);
        Ok(())
    }
}
