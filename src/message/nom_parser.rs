//! Nom-based IRC line parser.
//!
//! Splits one wire line into its raw components: tag block, source
//! prefix, command, middle parameters, and trailing. Tag unescaping and
//! hostmask parsing happen later, in [`super::Message`].

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::char,
    combinator::opt,
    error::{context, VerboseError},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse the IRCv3 tag block (after `@`, before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

/// Parse the source prefix (after `:`, before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

/// Parse the command token (verb or 3-digit numeric).
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_alphanumeric()),
    )(input)
}

fn skip_spaces(input: &str) -> &str {
    input.trim_start_matches(' ')
}

/// A parsed IRC line with borrowed string slices.
///
/// Middle parameters and the trailing message are kept apart: `params`
/// never contains the trailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// Raw tag block (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command token, as written on the wire.
    pub command: &'a str,
    /// Middle parameters.
    pub params: Vec<&'a str>,
    /// Trailing message (after ` :`), if present.
    pub trailing: Option<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Parse one IRC line (without its CR/LF terminator).
    ///
    /// Grammar, left to right:
    /// ```text
    /// [@tags ] [:prefix ] <command> [params...] [ :trailing]
    /// ```
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let trimmed = input.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let (rest, tags) = opt(parse_tags)(trimmed)
            .map_err(|_| malformed(trimmed))?;
        let rest = skip_spaces(rest);

        let (rest, prefix) = opt(parse_prefix)(rest)
            .map_err(|_| malformed(trimmed))?;
        let rest = skip_spaces(rest);

        let (rest, command) = parse_command(rest)
            .map_err(|_| malformed(trimmed))?;

        let mut params = Vec::new();
        let mut trailing = None;
        let mut rest = rest;

        while let Some(stripped) = rest.strip_prefix(' ') {
            rest = stripped;
            if let Some(t) = rest.strip_prefix(':') {
                trailing = Some(t);
                break;
            }
            let end = rest.find(' ').unwrap_or(rest.len());
            let param = &rest[..end];
            if param.is_empty() {
                continue;
            }
            params.push(param);
            rest = &rest[end..];
        }

        Ok(RawLine {
            tags,
            prefix,
            command,
            params,
            trailing,
        })
    }
}

fn malformed(line: &str) -> MessageParseError {
    MessageParseError::MalformedLine(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let line = RawLine::parse("PING").unwrap();
        assert_eq!(line.command, "PING");
        assert!(line.tags.is_none());
        assert!(line.prefix.is_none());
        assert!(line.params.is_empty());
        assert!(line.trailing.is_none());
    }

    #[test]
    fn test_parse_command_with_trailing() {
        let line = RawLine::parse("PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#channel"]);
        assert_eq!(line.trailing, Some("Hello, world!"));
    }

    #[test]
    fn test_parse_with_prefix() {
        let line = RawLine::parse(":nick!user@host PRIVMSG #channel :Hello").unwrap();
        assert_eq!(line.prefix, Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#channel"]);
        assert_eq!(line.trailing, Some("Hello"));
    }

    #[test]
    fn test_parse_with_tags() {
        let line =
            RawLine::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(line.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(line.prefix, Some("nick"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#ch"]);
        assert_eq!(line.trailing, Some("Hi"));
    }

    #[test]
    fn test_parse_with_crlf() {
        let line = RawLine::parse("PING :server\r\n").unwrap();
        assert_eq!(line.command, "PING");
        assert_eq!(line.trailing, Some("server"));
    }

    #[test]
    fn test_parse_multiple_params() {
        let line = RawLine::parse("USER guest 0 * :Real Name").unwrap();
        assert_eq!(line.command, "USER");
        assert_eq!(line.params, vec!["guest", "0", "*"]);
        assert_eq!(line.trailing, Some("Real Name"));
    }

    #[test]
    fn test_parse_numeric_response() {
        let line = RawLine::parse(":server 001 nick :Welcome").unwrap();
        assert_eq!(line.prefix, Some("server"));
        assert_eq!(line.command, "001");
        assert_eq!(line.params, vec!["nick"]);
        assert_eq!(line.trailing, Some("Welcome"));
    }

    #[test]
    fn test_parse_no_trailing() {
        let line = RawLine::parse(":nick!user@host JOIN #channel").unwrap();
        assert_eq!(line.command, "JOIN");
        assert_eq!(line.params, vec!["#channel"]);
        assert!(line.trailing.is_none());
    }

    #[test]
    fn test_parse_empty_trailing() {
        let line = RawLine::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(line.params, vec!["#channel"]);
        assert_eq!(line.trailing, Some(""));
    }

    #[test]
    fn test_parse_trailing_with_colons() {
        let line = RawLine::parse("PRIVMSG #channel :a :b :c").unwrap();
        assert_eq!(line.trailing, Some("a :b :c"));
    }

    #[test]
    fn test_parse_missing_command() {
        assert!(matches!(
            RawLine::parse(":prefix-only"),
            Err(MessageParseError::MalformedLine(_))
        ));
        assert!(matches!(
            RawLine::parse(""),
            Err(MessageParseError::EmptyMessage)
        ));
    }

    #[test]
    fn test_parse_complex_tags() {
        let line =
            RawLine::parse("@msgid=abc123;time=2023-01-01 :nick PRIVMSG #ch :msg").unwrap();
        assert_eq!(line.tags, Some("msgid=abc123;time=2023-01-01"));
    }
}
