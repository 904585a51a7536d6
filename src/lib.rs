//! # slirc-client
//!
//! An event-driven IRC client engine: it turns a bidirectional line
//! stream into semantic events and channel state, and turns commands
//! into a rate-limited outbound line stream.
//!
//! ## Features
//!
//! - IRC line parsing with IRCv3 message tags and lazy hostmask access
//! - Channel state tracking: topics, ban lists, and disjoint role sets
//!   (owners, ops, half-ops, voices, members)
//! - Typed event bus with persistent, one-shot, and filtered
//!   subscriptions
//! - Awaitable multi-numeric queries (WHOIS, ISON, VERSION, TOPIC)
//! - Paced outbound queue with priority bypass for handshake traffic
//! - Pluggable transport behind the [`Connection`](transport::Connection)
//!   trait, with a provided TCP/TLS implementation

#![deny(clippy::all)]
// TODO: Enable once documentation coverage is complete
// #![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust,no_run
//! use slirc_client::{Client, Config, Event, EventKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("examplebot", "irc.libera.chat");
//!     config.realname = Some("Example Bot".to_string());
//!
//!     let client = Client::new(config);
//!     client.subscribe(EventKind::Message, |event| {
//!         if let Event::Message(msg) = event {
//!             println!("<{}> {}: {}", msg.target, msg.from, msg.text);
//!         }
//!     });
//!     client.subscribe_once(EventKind::Ready, |_| {
//!         println!("registered");
//!     });
//!
//!     client.connect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing IRC Lines
//!
//! ```rust
//! use slirc_client::Message;
//!
//! let raw = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #channel :Hello!";
//! let message: Message = raw.parse().expect("valid IRC line");
//!
//! assert_eq!(message.command, "PRIVMSG");
//! assert_eq!(message.nick(), Some("nick"));
//! assert_eq!(message.trailing.as_deref(), Some("Hello!"));
//! ```

pub mod bus;
pub mod channel;
pub mod client;
mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod transport;
pub mod whois;

pub use self::bus::{EventBus, SubscriptionId};
pub use self::channel::{Channel, Role};
pub use self::client::Client;
pub use self::codec::IrcCodec;
pub use self::config::Config;
pub use self::error::{ClientError, MessageParseError, ModeParseError, Result};
pub use self::event::{
    ChatMessage, ErrorOrigin, Event, EventKind, KickInfo, Membership, ModeInfo, ServerVersion,
};
pub use self::isupport::{Isupport, PrefixMap};
pub use self::message::{Message, Tag};
pub use self::mode::ModeChange;
pub use self::prefix::Hostmask;
pub use self::transport::{Connection, TcpConnection, TransportError, MAX_LINE_LEN};
pub use self::whois::Whois;
