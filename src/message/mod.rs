//! Parsed IRC wire lines.
//!
//! [`Message`] is the structured form of one IRC line: IRCv3 tags, source
//! prefix, command, middle parameters, and trailing message. Messages are
//! immutable after construction; the hostmask is parsed from the prefix
//! on first access and cached.

mod nom_parser;
pub mod tags;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::MessageParseError;
use crate::prefix::Hostmask;

use self::nom_parser::RawLine;
use self::tags::{escape_tag_value, unescape_tag_value};

/// A single IRCv3 message tag: key plus optional value.
///
/// A tag without a value (`Tag(key, None)`) is a boolean flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag(pub String, pub Option<String>);

/// A parsed IRC line.
#[derive(Debug)]
pub struct Message {
    raw: String,
    /// IRCv3 tags in wire order, if the line carried a tag block.
    pub tags: Option<Vec<Tag>>,
    prefix: Option<String>,
    hostmask: OnceLock<Hostmask>,
    /// The command verb (uppercased) or 3-digit numeric.
    pub command: String,
    /// Middle parameters. Never contains the trailing.
    pub params: Vec<String>,
    /// Trailing message (the portion after ` :`), if present.
    pub trailing: Option<String>,
}

impl Message {
    /// Parse one IRC line (without its CR/LF terminator).
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let parsed = RawLine::parse(line)?;

        let tags = parsed
            .tags
            .map(|block| {
                block
                    .split(';')
                    .filter(|item| !item.is_empty())
                    .map(|item| match item.split_once('=') {
                        Some((key, value)) => {
                            Tag(key.to_string(), Some(unescape_tag_value(value)))
                        }
                        None => Tag(item.to_string(), None),
                    })
                    .collect()
            })
            .filter(|tags: &Vec<Tag>| !tags.is_empty());

        let command = if parsed.command.chars().all(|c| c.is_alphabetic()) {
            parsed.command.to_uppercase()
        } else {
            parsed.command.to_string()
        };

        Ok(Message {
            raw: line.trim_end_matches(['\r', '\n']).to_string(),
            tags,
            prefix: parsed.prefix.map(str::to_string),
            hostmask: OnceLock::new(),
            command,
            params: parsed.params.iter().map(|p| p.to_string()).collect(),
            trailing: parsed.trailing.map(str::to_string),
        })
    }

    /// The line as received, terminator stripped.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The raw source prefix, if the line carried one.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The sender's hostmask, parsed from the prefix on first access.
    pub fn hostmask(&self) -> Option<&Hostmask> {
        self.prefix
            .as_deref()
            .map(|p| self.hostmask.get_or_init(|| Hostmask::parse(p)))
    }

    /// The sender's nickname, when the line has a prefix.
    pub fn nick(&self) -> Option<&str> {
        self.hostmask().map(|h| h.nick.as_str())
    }

    /// Look up a tag by key.
    ///
    /// `Some(None)` means the tag is present as a flag; `Some(Some(v))`
    /// carries its unescaped value.
    pub fn tag(&self, key: &str) -> Option<Option<&str>> {
        self.tags
            .as_deref()
            .and_then(|tags| tags.iter().find(|t| t.0 == key))
            .map(|t| t.1.as_deref())
    }

    /// The tag set as a map. Flag tags map to `None`.
    pub fn tag_map(&self) -> HashMap<String, Option<String>> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.iter()
                    .map(|t| (t.0.clone(), t.1.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Middle parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        let hostmask = OnceLock::new();
        if let Some(h) = self.hostmask.get() {
            let _ = hostmask.set(h.clone());
        }
        Message {
            raw: self.raw.clone(),
            tags: self.tags.clone(),
            prefix: self.prefix.clone(),
            hostmask,
            command: self.command.clone(),
            params: self.params.clone(),
            trailing: self.trailing.clone(),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags
            && self.prefix == other.prefix
            && self.command == other.command
            && self.params == other.params
            && self.trailing == other.trailing
    }
}

impl Eq for Message {}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = self.tags.as_deref() {
            if !tags.is_empty() {
                f.write_str("@")?;
                for (i, tag) in tags.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    f.write_str(&tag.0)?;
                    if let Some(value) = tag.1.as_deref() {
                        f.write_str("=")?;
                        f.write_str(&escape_tag_value(value))?;
                    }
                }
                f.write_str(" ")?;
            }
        }
        if let Some(prefix) = self.prefix.as_deref() {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(trailing) = self.trailing.as_deref() {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_privmsg() {
        let msg = Message::parse(
            "@time=2023-01-01T00:00:00.000Z;account=alice :nick!u@h PRIVMSG #chan :hello",
        )
        .unwrap();
        assert_eq!(msg.tag("time"), Some(Some("2023-01-01T00:00:00.000Z")));
        assert_eq!(msg.tag("account"), Some(Some("alice")));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#chan"]);
        assert_eq!(msg.trailing.as_deref(), Some("hello"));

        let hostmask = msg.hostmask().unwrap();
        assert_eq!(hostmask.nick, "nick");
        assert_eq!(hostmask.user, "u");
        assert_eq!(hostmask.host, "h");
    }

    #[test]
    fn test_parse_flag_tag() {
        let msg = Message::parse("@solanum.chat/oper :n NOTICE x :hi").unwrap();
        assert_eq!(msg.tag("solanum.chat/oper"), Some(None));
        assert_eq!(msg.tag("missing"), None);
    }

    #[test]
    fn test_tag_value_keeps_embedded_equals() {
        let msg = Message::parse("@key=a=b=c PING :x").unwrap();
        assert_eq!(msg.tag("key"), Some(Some("a=b=c")));
    }

    #[test]
    fn test_command_uppercased() {
        let msg = Message::parse("privmsg #c :x").unwrap();
        assert_eq!(msg.command, "PRIVMSG");

        // Numerics pass through untouched
        let msg = Message::parse(":srv 005 n CHANTYPES=# :are supported").unwrap();
        assert_eq!(msg.command, "005");
    }

    #[test]
    fn test_hostmask_is_lazy_and_cached() {
        let msg = Message::parse(":nick!u@h PRIVMSG #c :x").unwrap();
        let first: *const Hostmask = msg.hostmask().unwrap();
        let second: *const Hostmask = msg.hostmask().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_no_prefix_no_hostmask() {
        let msg = Message::parse("PING :token").unwrap();
        assert!(msg.hostmask().is_none());
        assert!(msg.nick().is_none());
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "@time=2023-01-01T00:00:00Z :nick!u@h PRIVMSG #chan :hello world";
        let msg = Message::parse(raw).unwrap();
        let reparsed = Message::parse(&msg.to_string()).unwrap();
        assert_eq!(msg, reparsed);
    }

    #[test]
    fn test_display_no_trailing() {
        let msg = Message::parse(":n!u@h JOIN #chan").unwrap();
        assert_eq!(msg.to_string(), ":n!u@h JOIN #chan");
    }

    #[test]
    fn test_display_escapes_tag_values() {
        let msg = Message {
            raw: String::new(),
            tags: Some(vec![Tag("note".into(), Some("a;b c".into()))]),
            prefix: None,
            hostmask: OnceLock::new(),
            command: "PING".into(),
            params: vec![],
            trailing: None,
        };
        assert_eq!(msg.to_string(), "@note=a\\:b\\sc PING");
    }
}
