//! Error types for the IRC client engine.
//!
//! This module defines error types for command-level failures, message
//! parsing failures, and mode parsing issues. Transport-level errors live
//! in [`crate::transport`].

use thiserror::Error;

use crate::transport::TransportError;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level client errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound line exceeded the 510-byte payload limit.
    #[error("line too long: {0} bytes")]
    LineTooLong(usize),

    /// Topic exceeded the server-advertised TOPICLEN.
    #[error("topic too long: {len} bytes, server limit {max}")]
    TopicTooLong {
        /// Length of the rejected topic.
        len: usize,
        /// TOPICLEN advertised by the server.
        max: usize,
    },

    /// Operation requires an active connection.
    #[error("not connected")]
    NotConnected,

    /// A connection is already established or being established.
    #[error("already connected")]
    AlreadyConnected,

    /// The connection dropped while a request was outstanding.
    #[error("disconnected while awaiting reply")]
    Disconnected,

    /// Error surfaced from the connection facade.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Line had no command token.
    #[error("malformed line: {0}")]
    MalformedLine(String),
}

/// Errors encountered when parsing mode-change strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModeParseError {
    /// Mode string did not start with `+` or `-`, or contained a
    /// non-letter mode character.
    #[error("invalid mode string: {0}")]
    InvalidMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::LineTooLong(600);
        assert_eq!(format!("{}", err), "line too long: 600 bytes");

        let err = ClientError::TopicTooLong { len: 400, max: 307 };
        assert_eq!(
            format!("{}", err),
            "topic too long: 400 bytes, server limit 307"
        );

        let err = ModeParseError::InvalidMode("ov".to_string());
        assert_eq!(format!("{}", err), "invalid mode string: ov");
    }

    #[test]
    fn test_error_source_chaining() {
        let parse_err = MessageParseError::MalformedLine(":prefix-only".to_string());
        let client_err = ClientError::InvalidMessage {
            string: ":prefix-only".to_string(),
            cause: parse_err.clone(),
        };

        let source = std::error::Error::source(&client_err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), parse_err.to_string());
    }

    #[test]
    fn test_error_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let client_err: ClientError = io_err.into();

        match client_err {
            ClientError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }
}
