//! Integration tests for message parsing and serialization
//!
//! These tests verify that lines can be parsed into messages and then
//! serialized back to equivalent lines, ensuring round-trip
//! compatibility.

use slirc_client::Message;

fn assert_round_trip(original: &str) -> Message {
    let message: Message = original
        .parse()
        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", original, e));
    let serialized = message.to_string();

    let reparsed: Message = serialized
        .parse()
        .unwrap_or_else(|e| panic!("Failed to reparse '{}': {}", serialized, e));
    assert_eq!(message, reparsed, "Round-trip failed for '{}'", original);
    message
}

#[test]
fn test_message_round_trip_simple() {
    assert_round_trip("PING :irc.example.com");
}

#[test]
fn test_message_round_trip_with_prefix() {
    let msg = assert_round_trip(":nick!user@host PRIVMSG #channel :Hello, world!");
    assert_eq!(msg.nick(), Some("nick"));
}

#[test]
fn test_message_round_trip_with_tags() {
    let msg = assert_round_trip(
        "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Tagged message",
    );
    assert_eq!(msg.tag("time"), Some(Some("2023-01-01T00:00:00.000Z")));
    assert_eq!(msg.tag("msgid"), Some(Some("abc123")));
}

#[test]
fn test_message_round_trip_numeric_response() {
    let msg = assert_round_trip(":server 001 nickname :Welcome to the IRC Network");
    assert_eq!(msg.command, "001");
    assert_eq!(msg.params, vec!["nickname"]);
}

#[test]
fn test_message_round_trip_flag_and_valued_tags() {
    let msg = assert_round_trip(
        "@batch=abc123;solanum.chat/oper;time=2023-01-01T12:00:00Z :nick PRIVMSG #channel :hi",
    );
    assert_eq!(msg.tag("solanum.chat/oper"), Some(None));
    assert_eq!(msg.tag("batch"), Some(Some("abc123")));
}

#[test]
fn test_message_round_trip_escaped_tag_value() {
    let msg = assert_round_trip("@note=semi\\:space\\svalue PING :x");
    assert_eq!(msg.tag("note"), Some(Some("semi;space value")));
}

#[test]
fn test_empty_trailing_parameter() {
    let msg = assert_round_trip("PRIVMSG #channel :");
    assert_eq!(msg.trailing.as_deref(), Some(""));
}

#[test]
fn test_special_characters_in_message() {
    assert_round_trip(":nick!user@host PRIVMSG #channel :ünïçødé ☂ text");
}

#[test]
fn test_mode_command_round_trip() {
    let msg = assert_round_trip(":server MODE #channel +o nick");
    assert_eq!(msg.params, vec!["#channel", "+o", "nick"]);
    assert!(msg.trailing.is_none());
}

#[test]
fn test_join_command_variations() {
    let test_cases = vec![
        "JOIN #channel",
        "JOIN #channel key",
        ":nick!user@host JOIN #channel",
        "JOIN #channel1,#channel2 key1,key2",
        ":nick!user@host JOIN :#channel",
    ];

    for original in test_cases {
        assert_round_trip(original);
    }
}

#[test]
fn test_names_reply_round_trip() {
    let msg = assert_round_trip(":server 353 bot = #c :@alice +bob ~carol dave");
    assert_eq!(msg.params, vec!["bot", "=", "#c"]);
    assert_eq!(msg.trailing.as_deref(), Some("@alice +bob ~carol dave"));
}

#[test]
fn test_trailing_with_embedded_colons() {
    let msg = assert_round_trip("PRIVMSG #c :see: the :colons stay");
    assert_eq!(msg.trailing.as_deref(), Some("see: the :colons stay"));
}
