//! The numeric reply catalog (RFC 2812 subset).
//!
//! Every server-to-client line is `:server <numeric> <target> <args>
//! [:<trailing>]`. The exact texts are load-bearing: existing IRC clients key
//! off them, so they are reproduced byte-for-byte. Most error numerics carry
//! a literal `*` target rather than the caller's nick; that quirk is part of
//! the wire contract and is kept as-is.

use crate::message::Message;

/// Prefix used on every server-originated line.
pub const SERVER_PREFIX: &str = "server";

/// Constructors for the reply catalog.
///
/// Grouped by numeric range: welcome burst (001-004), channel replies
/// (324-366), errors (401-482).
pub struct Response;

impl Response {
    fn reply(code: &str, params: Vec<String>, trailing: impl Into<String>) -> Message {
        Message::with_trailing(SERVER_PREFIX, code, params, trailing)
    }

    fn reply_bare(code: &str, params: Vec<String>) -> Message {
        Message::new(SERVER_PREFIX, code, params)
    }

    // Welcome burst (001-004)

    pub fn rpl_welcome(nick: &str) -> Message {
        Self::reply(
            "001",
            vec![nick.into()],
            format!("Welcome to the IRC Network {nick}"),
        )
    }

    pub fn rpl_yourhost(nick: &str) -> Message {
        Self::reply(
            "002",
            vec![nick.into()],
            "Your host is server, running version 1.0",
        )
    }

    pub fn rpl_created(nick: &str) -> Message {
        Self::reply("003", vec![nick.into()], "This server was created recently")
    }

    pub fn rpl_myinfo(nick: &str) -> Message {
        Self::reply("004", vec![nick.into()], "server 1.0 o o")
    }

    // Channel replies (324, 331-332, 341, 353, 366)

    pub fn rpl_channelmodeis(nick: &str, channel: &str, modes: &str) -> Message {
        Self::reply_bare("324", vec![nick.into(), channel.into(), modes.into()])
    }

    pub fn rpl_notopic(nick: &str, channel: &str) -> Message {
        Self::reply("331", vec![nick.into(), channel.into()], "No topic is set")
    }

    pub fn rpl_topic(nick: &str, channel: &str, topic: &str) -> Message {
        Self::reply("332", vec![nick.into(), channel.into()], topic)
    }

    pub fn rpl_inviting(nick: &str, target: &str, channel: &str) -> Message {
        Self::reply_bare("341", vec![nick.into(), target.into(), channel.into()])
    }

    /// `names` is the pre-built listing, operators marked with `@`, each name
    /// followed by a space.
    pub fn rpl_namreply(nick: &str, channel: &str, names: &str) -> Message {
        Self::reply(
            "353",
            vec![nick.into(), "=".into(), channel.into()],
            names,
        )
    }

    pub fn rpl_endofnames(nick: &str, channel: &str) -> Message {
        Self::reply(
            "366",
            vec![nick.into(), channel.into()],
            "End of /NAMES list",
        )
    }

    // Error replies (401-482)

    pub fn err_nosuchnick(target: &str) -> Message {
        Self::reply("401", vec!["*".into(), target.into()], "No such nick/channel")
    }

    pub fn err_nosuchchannel(channel: &str) -> Message {
        Self::reply("403", vec!["*".into(), channel.into()], "No such channel")
    }

    pub fn err_cannotsendtochan(channel: &str) -> Message {
        Self::reply(
            "404",
            vec!["*".into(), channel.into()],
            "Cannot send to channel",
        )
    }

    pub fn err_norecipient(command: &str) -> Message {
        Self::reply(
            "411",
            vec!["*".into()],
            format!("No recipient given ({command})"),
        )
    }

    pub fn err_unknowncommand(command: &str) -> Message {
        Self::reply("421", vec!["*".into(), command.into()], "Unknown command")
    }

    pub fn err_nonicknamegiven() -> Message {
        Self::reply("431", vec!["*".into()], "No nickname given")
    }

    /// `current` is the caller's present nick, or `*` when none is set yet.
    pub fn err_nicknameinuse(current: &str, attempted: &str) -> Message {
        Self::reply(
            "433",
            vec![current.into(), attempted.into()],
            "Nickname is already in use",
        )
    }

    pub fn err_usernotinchannel(nick: &str, channel: &str) -> Message {
        Self::reply(
            "441",
            vec!["*".into(), nick.into(), channel.into()],
            "They aren't on that channel",
        )
    }

    pub fn err_notonchannel(channel: &str) -> Message {
        Self::reply(
            "442",
            vec!["*".into(), channel.into()],
            "You're not on that channel",
        )
    }

    pub fn err_useronchannel(nick: &str, channel: &str) -> Message {
        Self::reply(
            "443",
            vec!["*".into(), nick.into(), channel.into()],
            "is already on channel",
        )
    }

    pub fn err_notregistered() -> Message {
        Self::reply("451", vec!["*".into()], "You have not registered")
    }

    pub fn err_needmoreparams(command: &str) -> Message {
        Self::reply(
            "461",
            vec!["*".into(), command.into()],
            "Not enough parameters",
        )
    }

    pub fn err_alreadyregistred() -> Message {
        Self::reply("462", vec!["*".into()], "You may not reregister")
    }

    pub fn err_passwdmismatch() -> Message {
        Self::reply("464", vec!["*".into()], "Password incorrect")
    }

    pub fn err_channelisfull(channel: &str) -> Message {
        Self::reply(
            "471",
            vec!["*".into(), channel.into()],
            "Cannot join channel (+l)",
        )
    }

    pub fn err_unknownmode(mode: char) -> Message {
        Self::reply(
            "472",
            vec!["*".into(), mode.to_string()],
            "is unknown mode char to me",
        )
    }

    pub fn err_inviteonlychan(channel: &str) -> Message {
        Self::reply(
            "473",
            vec!["*".into(), channel.into()],
            "Cannot join channel (+i)",
        )
    }

    pub fn err_badchannelkey(channel: &str) -> Message {
        Self::reply(
            "475",
            vec!["*".into(), channel.into()],
            "Cannot join channel (+k)",
        )
    }

    pub fn err_chanoprivsneeded(channel: &str) -> Message {
        Self::reply(
            "482",
            vec!["*".into(), channel.into()],
            "You're not channel operator",
        )
    }

    // Non-numeric server lines

    /// Empty capability listing for `CAP LS`.
    pub fn cap_ls() -> Message {
        Message::with_trailing(SERVER_PREFIX, "CAP", vec!["*".into(), "LS".into()], "")
    }

    /// Server notice to one client (used by the transfer subsystem).
    pub fn notice(nick: &str, text: impl Into<String>) -> Message {
        Message::with_trailing(SERVER_PREFIX, "NOTICE", vec![nick.into()], text)
    }
}
