//! Unified error handling for fennecd.
//!
//! Command handlers signal failures through [`CommandError`]; the connection
//! loop converts each into its catalog reply with [`CommandError::to_reply`]
//! and keeps the connection open. Variants without a client-visible reply
//! (quit, send failure) drive teardown instead.

use fennec_proto::{Message, Response};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("not enough parameters for {0}")]
    NeedMoreParams(String),

    #[error("no recipient for {0}")]
    NoRecipient(String),

    #[error("password incorrect")]
    PasswdMismatch,

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("no nickname given")]
    NoNicknameGiven,

    #[error("nickname in use: {attempted}")]
    NicknameInUse { current: String, attempted: String },

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("cannot send to channel: {0}")]
    CannotSendToChan(String),

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("user {nick} is not on {channel}")]
    UserNotInChannel { nick: String, channel: String },

    #[error("user {nick} is already on {channel}")]
    UserOnChannel { nick: String, channel: String },

    #[error("channel operator privileges needed on {0}")]
    ChanOpPrivsNeeded(String),

    #[error("channel is full: {0}")]
    ChannelIsFull(String),

    #[error("invite-only channel: {0}")]
    InviteOnlyChan(String),

    #[error("bad channel key: {0}")]
    BadChannelKey(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The client asked to leave; the connection loop tears down after this.
    #[error("client quit: {0:?}")]
    Quit(Option<String>),

    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<Message>),
}

impl CommandError {
    /// Convert to the catalog reply sent to the offending connection.
    ///
    /// Returns `None` for errors that don't warrant a client-visible reply
    /// (quit, send failures).
    pub fn to_reply(&self) -> Option<Message> {
        let msg = match self {
            Self::NeedMoreParams(cmd) => Response::err_needmoreparams(cmd),
            Self::NoRecipient(cmd) => Response::err_norecipient(cmd),
            Self::PasswdMismatch => Response::err_passwdmismatch(),
            Self::NotRegistered => Response::err_notregistered(),
            Self::AlreadyRegistered => Response::err_alreadyregistred(),
            Self::NoNicknameGiven => Response::err_nonicknamegiven(),
            Self::NicknameInUse { current, attempted } => {
                Response::err_nicknameinuse(current, attempted)
            }
            Self::NoSuchNick(target) => Response::err_nosuchnick(target),
            Self::NoSuchChannel(channel) => Response::err_nosuchchannel(channel),
            Self::CannotSendToChan(channel) => Response::err_cannotsendtochan(channel),
            Self::NotOnChannel(channel) => Response::err_notonchannel(channel),
            Self::UserNotInChannel { nick, channel } => {
                Response::err_usernotinchannel(nick, channel)
            }
            Self::UserOnChannel { nick, channel } => {
                Response::err_useronchannel(nick, channel)
            }
            Self::ChanOpPrivsNeeded(channel) => Response::err_chanoprivsneeded(channel),
            Self::ChannelIsFull(channel) => Response::err_channelisfull(channel),
            Self::InviteOnlyChan(channel) => Response::err_inviteonlychan(channel),
            Self::BadChannelKey(channel) => Response::err_badchannelkey(channel),
            Self::UnknownCommand(cmd) => Response::err_unknowncommand(cmd),

            Self::Quit(_) => return None,
            Self::Send(_) => return None,
        };
        Some(msg)
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<(), CommandError>;
