//! Events emitted by the protocol engine.
//!
//! The engine turns inbound server lines into the closed set of
//! [`Event`] variants below; listeners subscribe per [`EventKind`]
//! through the client. Payloads are owned so events can cross task
//! boundaries freely.

use std::collections::HashMap;

use crate::mode::ModeChange;
use crate::whois::Whois;

/// A chat-style payload: PRIVMSG, NOTICE, CTCP, and ACTION events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender nickname (raw prefix for server notices to `*`).
    pub from: String,
    /// Target: a channel name or our own nickname.
    pub target: String,
    /// Message body, CTCP framing already stripped where applicable.
    pub text: String,
}

/// A remote user entering or leaving a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    /// The channel concerned.
    pub channel: String,
    /// The user's nickname.
    pub nick: String,
    /// Part/quit reason, when one was given.
    pub reason: Option<String>,
}

/// A user kicked from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KickInfo {
    /// The channel concerned.
    pub channel: String,
    /// Who was kicked.
    pub nick: String,
    /// Who issued the kick.
    pub by: String,
    /// Kick reason, when one was given.
    pub reason: Option<String>,
}

/// A channel mode change as observed on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeInfo {
    /// The channel (or other target) the mode applies to.
    pub channel: String,
    /// The parsed `+x`/`-x` change.
    pub change: ModeChange,
    /// Mode argument (nickname or mask), when present.
    pub target: Option<String>,
    /// Who set the mode.
    pub by: String,
}

/// Reply to a VERSION query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerVersion {
    /// Server software version string.
    pub version: String,
    /// Reporting server name.
    pub server: String,
    /// Free-form comments.
    pub comments: Option<String>,
}

/// Where an [`Event::Error`] originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The server sent an ERROR line.
    Server,
    /// The connection facade failed.
    Transport,
}

/// Everything the engine can tell its listeners.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Event {
    /// Transport established; handshake follows.
    Connect,
    /// Connection torn down.
    Disconnect,
    /// A raw inbound line, before dispatch.
    LineReceive(String),
    /// A raw outbound line, after the transport write.
    LineSent(String),
    /// The server finished its preamble; commands are safe to send.
    Ready,
    /// Accumulated MOTD text.
    Motd(String),
    /// PRIVMSG.
    Message(ChatMessage),
    /// NOTICE.
    Notice(ChatMessage),
    /// CTCP request (surrounding `\x01` stripped).
    Ctcp(ChatMessage),
    /// CTCP ACTION (`/me`), leading `ACTION ` stripped.
    Action(ChatMessage),
    /// A remote user joined a channel we are in.
    Join(Membership),
    /// We joined a channel.
    BotJoin {
        /// The channel joined.
        channel: String,
    },
    /// A remote user left a channel we are in.
    Part(Membership),
    /// We left a channel.
    BotPart {
        /// The channel left.
        channel: String,
    },
    /// A user quit the network.
    Quit {
        /// Who quit.
        nick: String,
        /// Quit reason, when one was given.
        reason: Option<String>,
    },
    /// Synthetic per-channel part emitted for each channel a quitting
    /// user was in.
    QuitPart(Membership),
    /// A user was kicked.
    Kick(KickInfo),
    /// A user (possibly us) changed nickname.
    NickChange {
        /// Previous nickname.
        old: String,
        /// New nickname.
        new: String,
    },
    /// The requested nickname is taken (433).
    NickInUse {
        /// The rejected nickname.
        nick: String,
    },
    /// Channel topic received or changed.
    Topic {
        /// The channel concerned.
        channel: String,
        /// The topic text.
        topic: String,
    },
    /// Channel mode change.
    Mode(ModeInfo),
    /// Completed WHOIS query (terminated by 318).
    ///
    /// Boxed to reduce enum size variance (the accumulator is large).
    Whois(Box<Whois>),
    /// PONG reply.
    Pong {
        /// The echoed token.
        token: String,
    },
    /// We were invited to a channel.
    Invite {
        /// The channel we were invited to.
        channel: String,
        /// Who invited us.
        from: String,
    },
    /// ISON reply (303): the subset of queried nicks currently online.
    IsOn(Vec<String>),
    /// VERSION reply (351).
    ServerVersion(ServerVersion),
    /// ISUPPORT line processed (005); snapshot of the merged map.
    ServerSupports(HashMap<String, Option<String>>),
    /// We are now a server operator (381).
    ServerOperator,
    /// Transport fault or server ERROR line.
    Error {
        /// Which side produced the error.
        origin: ErrorOrigin,
        /// Human-readable description.
        text: String,
    },
}

/// Discriminants of [`Event`], used to key subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    Connect,
    Disconnect,
    LineReceive,
    LineSent,
    Ready,
    Motd,
    Message,
    Notice,
    Ctcp,
    Action,
    Join,
    BotJoin,
    Part,
    BotPart,
    Quit,
    QuitPart,
    Kick,
    NickChange,
    NickInUse,
    Topic,
    Mode,
    Whois,
    Pong,
    Invite,
    IsOn,
    ServerVersion,
    ServerSupports,
    ServerOperator,
    Error,
}

impl Event {
    /// The subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connect => EventKind::Connect,
            Event::Disconnect => EventKind::Disconnect,
            Event::LineReceive(_) => EventKind::LineReceive,
            Event::LineSent(_) => EventKind::LineSent,
            Event::Ready => EventKind::Ready,
            Event::Motd(_) => EventKind::Motd,
            Event::Message(_) => EventKind::Message,
            Event::Notice(_) => EventKind::Notice,
            Event::Ctcp(_) => EventKind::Ctcp,
            Event::Action(_) => EventKind::Action,
            Event::Join(_) => EventKind::Join,
            Event::BotJoin { .. } => EventKind::BotJoin,
            Event::Part(_) => EventKind::Part,
            Event::BotPart { .. } => EventKind::BotPart,
            Event::Quit { .. } => EventKind::Quit,
            Event::QuitPart(_) => EventKind::QuitPart,
            Event::Kick(_) => EventKind::Kick,
            Event::NickChange { .. } => EventKind::NickChange,
            Event::NickInUse { .. } => EventKind::NickInUse,
            Event::Topic { .. } => EventKind::Topic,
            Event::Mode(_) => EventKind::Mode,
            Event::Whois(_) => EventKind::Whois,
            Event::Pong { .. } => EventKind::Pong,
            Event::Invite { .. } => EventKind::Invite,
            Event::IsOn(_) => EventKind::IsOn,
            Event::ServerVersion(_) => EventKind::ServerVersion,
            Event::ServerSupports(_) => EventKind::ServerSupports,
            Event::ServerOperator => EventKind::ServerOperator,
            Event::Error { .. } => EventKind::Error,
        }
    }
}
