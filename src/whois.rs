//! WHOIS reply accumulation.
//!
//! A WHOIS query answers as a burst of numerics (311–319, 330) closed by
//! 318. The engine folds them into a [`Whois`] record keyed by nickname
//! and emits it once the terminator arrives.

use std::collections::HashSet;

/// Accumulated WHOIS data for one nickname.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whois {
    /// The queried nickname.
    pub nickname: String,
    /// Ident reported by 311.
    pub username: Option<String>,
    /// Host reported by 311.
    pub hostname: Option<String>,
    /// Real name reported by 311.
    pub realname: Option<String>,
    /// Server the user is attached to (312).
    pub server: Option<String>,
    /// Free-form server description (312).
    pub server_info: Option<String>,
    /// Whether the user is an IRC operator (313).
    pub operator: bool,
    /// Seconds idle, when the server reported it (317).
    pub idle_seconds: Option<u64>,
    /// Services account (330).
    pub account: Option<String>,
    /// Channels the user is in (319), sigils stripped.
    pub channels: HashSet<String>,
    /// Channels where the user is an owner (`~`).
    pub owner_in: HashSet<String>,
    /// Channels where the user is an op (`@`).
    pub op_in: HashSet<String>,
    /// Channels where the user is a half-op (`%`).
    pub halfop_in: HashSet<String>,
    /// Channels where the user is voiced (`+`).
    pub voice_in: HashSet<String>,
}

impl Whois {
    /// Start an accumulator for `nickname`.
    pub fn new(nickname: impl Into<String>) -> Whois {
        Whois {
            nickname: nickname.into(),
            ..Whois::default()
        }
    }

    /// Whether the user reported any idle time.
    pub fn is_idle(&self) -> bool {
        self.idle_seconds.is_some()
    }

    /// Fold one entry of a 319 channel list: an optional role sigil
    /// followed by the channel name.
    pub(crate) fn add_channel_entry(&mut self, entry: &str) {
        let mut rest = entry;
        let mut sigil = None;
        while let Some(c) = rest.chars().next() {
            if matches!(c, '~' | '@' | '%' | '+') {
                sigil.get_or_insert(c);
                rest = &rest[c.len_utf8()..];
            } else {
                break;
            }
        }
        if rest.is_empty() {
            return;
        }
        let channel = rest.to_string();
        match sigil {
            Some('~') => {
                self.owner_in.insert(channel.clone());
            }
            Some('@') => {
                self.op_in.insert(channel.clone());
            }
            Some('%') => {
                self.halfop_in.insert(channel.clone());
            }
            Some('+') => {
                self.voice_in.insert(channel.clone());
            }
            _ => {}
        }
        self.channels.insert(channel);
    }
}
