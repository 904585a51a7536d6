//! Line framing for the IRC wire protocol.
//!
//! Decodes `\r\n`-terminated lines (tolerating bare `\n`) into `String`s
//! with the terminator stripped, and appends `\r\n` on encode. Inbound
//! lines beyond the protocol ceiling are rejected rather than buffered
//! without bound.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::transport::{TransportError, MAX_INBOUND_LINE_LEN};

/// Codec for `Framed` IRC transports.
#[derive(Debug)]
pub struct IrcCodec {
    max_length: usize,
}

impl IrcCodec {
    pub fn new() -> IrcCodec {
        IrcCodec {
            max_length: MAX_INBOUND_LINE_LEN,
        }
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        IrcCodec::new()
    }
}

impl Decoder for IrcCodec {
    type Item = String;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, TransportError> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > self.max_length {
                let len = src.len();
                src.clear();
                return Err(TransportError::MessageTooLong(len));
            }
            return Ok(None);
        };

        if pos > self.max_length {
            src.advance(pos + 1);
            return Err(TransportError::MessageTooLong(pos));
        }

        let line = src.split_to(pos + 1);
        let line = &line[..pos];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }
}

impl Encoder<String> for IrcCodec {
    type Error = TransportError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), TransportError> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_terminator() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PING :token\r\nPONG :token\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :token".into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PONG :token".into()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_line_waits() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PRIVMSG #chan :partial");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.put_slice(b" done\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #chan :partial done".into())
        );
    }

    #[test]
    fn test_decode_rejects_oversized_line() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        buf.put_slice(&vec![b'x'; MAX_INBOUND_LINE_LEN + 10]);
        buf.put_slice(b"\r\n");

        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::MessageTooLong(_))
        ));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("NICK bot".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"NICK bot\r\n");
    }
}
