//! Property-based tests for IRC line parsing.
//!
//! Uses proptest to generate random IRC components and verify that:
//! 1. Parsing never panics on arbitrary input
//! 2. Serialized messages can be re-parsed (roundtrip)
//! 3. Parser invariants hold across random inputs

use proptest::prelude::*;
use slirc_client::Message;

// =============================================================================
// STRATEGIES - Generators for valid IRC components
// =============================================================================

/// Valid IRC nickname: starts with letter or special char, followed by
/// letters, digits, or special chars. Max 9 chars per RFC 2812.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,8}")
        .expect("valid regex")
}

/// Valid IRC username (ident): alphanumeric, no spaces or @ or !
fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

/// Valid hostname: simplified version
fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex")
}

/// Valid IRC channel name: starts with # or &, followed by valid chars
fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&][a-zA-Z0-9_\\-]{1,49}").expect("valid regex")
}

/// Message text that doesn't contain CR/LF (which would break the framing)
fn message_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,400}").expect("valid regex")
}

/// Tag key: alphanumeric with optional vendor prefix
fn tag_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9\\-]{0,30}").expect("valid regex")
}

/// Tag value: characters that survive the wire without escaping
fn tag_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9._\\-]{0,200}").expect("valid regex")
}

/// A command verb
fn verb_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{3,10}").expect("valid regex")
}

/// A middle parameter: no spaces, does not start with `:`
fn param_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9#&@!*_\\-]{1,30}").expect("valid regex")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental roundtrip property: parse → serialize → parse = identity
    #[test]
    fn message_roundtrip(
        verb in verb_strategy(),
        params in prop::collection::vec(param_strategy(), 0..4),
        trailing in prop::option::of(message_text_strategy()),
    ) {
        let mut line = verb.clone();
        for param in &params {
            line.push(' ');
            line.push_str(param);
        }
        if let Some(trailing) = &trailing {
            line.push_str(" :");
            line.push_str(trailing);
        }

        let msg: Message = line.parse().expect("built line should parse");
        prop_assert_eq!(&msg.command, &verb);
        prop_assert_eq!(&msg.params, &params);
        prop_assert_eq!(msg.trailing.as_deref(), trailing.as_deref());

        let reparsed: Message = msg.to_string().parse()
            .expect("serialized message should be parseable");
        prop_assert_eq!(&msg, &reparsed,
            "Roundtrip failed for serialized: {}", msg.to_string());
    }

    /// PRIVMSG with arbitrary (valid) content should roundtrip
    #[test]
    fn privmsg_roundtrip(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy(),
        target in channel_strategy(),
        text in message_text_strategy()
    ) {
        let line = format!(":{}!{}@{} PRIVMSG {} :{}", nick, user, host, target, text);
        let msg: Message = line.parse().expect("PRIVMSG should parse");

        prop_assert_eq!(msg.nick(), Some(nick.as_str()));
        prop_assert_eq!(msg.param(0), Some(target.as_str()));
        prop_assert_eq!(msg.trailing.as_deref(), Some(text.as_str()));

        let reparsed: Message = msg.to_string().parse().expect("should reparse");
        prop_assert_eq!(msg, reparsed);
    }

    /// Tags should serialize in a way that can be parsed back
    #[test]
    fn tag_in_message_roundtrip(
        key in tag_key_strategy(),
        value in prop::option::of(tag_value_strategy())
    ) {
        let line = match &value {
            Some(v) => format!("@{}={} PING :test", key, v),
            None => format!("@{} PING :test", key),
        };
        let msg: Message = line.parse().expect("tagged message should parse");

        let parsed_value = msg.tag(&key).expect("tag should be present");
        prop_assert_eq!(value.as_deref(), parsed_value,
            "Tag value mismatch for key '{}'", key);

        let reparsed: Message = msg.to_string().parse().expect("should reparse");
        prop_assert_eq!(msg, reparsed);
    }

    /// Hostmask extraction holds for generated prefixes
    #[test]
    fn source_nickname_extraction(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy()
    ) {
        let line = format!(":{}!{}@{} PING :test", nick, user, host);
        let msg: Message = line.parse().expect("should parse");

        let hostmask = msg.hostmask().expect("prefix present");
        prop_assert_eq!(&hostmask.nick, &nick);
        prop_assert_eq!(&hostmask.user, &user);
        prop_assert_eq!(&hostmask.host, &host);
    }

    /// Parsing never panics, whatever the input looks like
    #[test]
    fn parse_never_panics(line in "[^\r\n]{0,512}") {
        let _ = line.parse::<Message>();
    }
}

// =============================================================================
// EDGE CASE TESTS
// =============================================================================

proptest! {
    /// Empty trailing should be preserved through the roundtrip
    #[test]
    fn empty_trailing_roundtrip(target in channel_strategy()) {
        let line = format!("PRIVMSG {} :", target);
        let msg: Message = line.parse().expect("should parse");
        prop_assert_eq!(msg.trailing.as_deref(), Some(""));

        let reparsed: Message = msg.to_string().parse().expect("should reparse");
        prop_assert_eq!(msg, reparsed);
    }

    /// Multiple tags maintain order and values
    #[test]
    fn multiple_tags_roundtrip(
        keys in prop::collection::hash_set(tag_key_strategy(), 1..5),
        value in tag_value_strategy(),
    ) {
        let keys: Vec<_> = keys.into_iter().collect();
        let block = keys
            .iter()
            .map(|k| format!("{}={}", k, value))
            .collect::<Vec<_>>()
            .join(";");
        let line = format!("@{} PING :test", block);

        let msg: Message = line.parse().expect("should parse");
        let tags = msg.tags.as_ref().expect("tags should exist");
        prop_assert_eq!(keys.len(), tags.len());
        for (tag, key) in tags.iter().zip(&keys) {
            prop_assert_eq!(&tag.0, key, "tag order not preserved");
        }

        let reparsed: Message = msg.to_string().parse().expect("should reparse");
        prop_assert_eq!(msg, reparsed);
    }
}
