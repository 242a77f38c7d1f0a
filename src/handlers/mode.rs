//! Channel MODE handling (i, t, k, o, l).

use crate::error::{CommandError, CommandResult};
use crate::handlers::{Context, Handler};
use async_trait::async_trait;
use fennec_proto::{Message, Response};
use tracing::debug;

/// Accumulates the mode changes that actually took effect, so the channel
/// notice reflects reality rather than everything the operator typed.
#[derive(Default)]
struct AppliedModes {
    modes: String,
    params: Vec<String>,
    last_polarity: Option<bool>,
}

impl AppliedModes {
    fn push(&mut self, adding: bool, mode: char, param: Option<&str>) {
        if self.last_polarity != Some(adding) {
            self.modes.push(if adding { '+' } else { '-' });
            self.last_polarity = Some(adding);
        }
        self.modes.push(mode);
        if let Some(param) = param {
            self.params.push(param.to_string());
        }
    }

    fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    fn into_message(self, prefix: &str, channel: &str) -> Message {
        let mut params = vec![channel.to_string(), self.modes];
        params.extend(self.params);
        Message::new(prefix, "MODE", params)
    }
}

fn next_param<'a>(msg: &'a Message, idx: &mut usize) -> Option<&'a str> {
    let param = msg.params.get(*idx).map(String::as_str);
    if param.is_some() {
        *idx += 1;
    }
    param
}

pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        let Some(name) = msg.arg(0) else {
            return Err(CommandError::NeedMoreParams("MODE".into()));
        };
        let chan_arc = ctx
            .engine
            .channel(name)
            .ok_or_else(|| CommandError::NoSuchChannel(name.to_string()))?;

        // View: current flags, no membership required.
        let Some(modestring) = msg.arg(1) else {
            let chan = chan_arc.read().await;
            let modes = chan.mode_string();
            drop(chan);
            let nick = ctx
                .engine
                .nick_of(ctx.conn)
                .await
                .ok_or(CommandError::NotRegistered)?;
            return ctx.reply(Response::rpl_channelmodeis(&nick, name, &modes));
        };

        let mut chan = chan_arc.write().await;
        if !chan.is_operator(ctx.conn) {
            return Err(CommandError::ChanOpPrivsNeeded(name.to_string()));
        }

        let mut applied = AppliedModes::default();
        let mut adding = true;
        let mut param_idx = 2;

        for mode in modestring.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                'i' => {
                    chan.invite_only = adding;
                    applied.push(adding, 'i', None);
                }
                't' => {
                    chan.topic_restricted = adding;
                    applied.push(adding, 't', None);
                }
                'k' => {
                    if adding {
                        if let Some(key) = next_param(msg, &mut param_idx) {
                            chan.key = Some(key.to_string());
                            applied.push(true, 'k', Some(key));
                        }
                    } else {
                        chan.key = None;
                        applied.push(false, 'k', None);
                    }
                }
                'o' => {
                    // The nick argument is consumed whether or not it names
                    // a member; only valid targets produce a change.
                    if let Some(target_nick) = next_param(msg, &mut param_idx) {
                        let target = ctx
                            .engine
                            .conn_by_nick(target_nick)
                            .filter(|&id| chan.is_member(id));
                        if let Some(target) = target {
                            if adding {
                                chan.add_operator(target);
                            } else {
                                chan.remove_operator(target);
                            }
                            applied.push(adding, 'o', Some(target_nick));
                        } else {
                            debug!(channel = %name, nick = %target_nick, "MODE o target not in channel");
                        }
                    }
                }
                'l' => {
                    if adding {
                        if let Some(raw) = next_param(msg, &mut param_idx) {
                            chan.user_limit = raw.parse().unwrap_or(0);
                            applied.push(true, 'l', Some(raw));
                        }
                    } else {
                        chan.user_limit = 0;
                        applied.push(false, 'l', None);
                    }
                }
                other => {
                    ctx.reply(Response::err_unknownmode(other))?;
                }
            }
        }

        if applied.is_empty() {
            return Ok(());
        }
        let members = chan.member_ids();
        drop(chan);

        let prefix = ctx
            .engine
            .prefix_of(ctx.conn)
            .await
            .ok_or(CommandError::NotRegistered)?;
        let notice = applied.into_message(&prefix, name);
        ctx.engine.broadcast(&members, &notice, None);
        Ok(())
    }
}
