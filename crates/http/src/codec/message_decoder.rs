//! Streaming decoder for complete quasi-HTTP messages.
//!
//! A message arrives as a header-section frame (`[4-byte tag][4-byte
//! big-endian length][delimited-text block]`) followed by body bytes framed
//! according to the declared content length. The decoder is a two-phase
//! state machine driven by `FramedRead`: it consumes from the backing
//! stream only as the consumer polls, and anything it reads past a logical
//! boundary stays in the `BytesMut` buffer for the next phase or the next
//! message — never dropped, never duplicated.
//!
//! The header-frame length is checked against the configured limit before
//! the block is buffered, so an oversized peer cannot force an oversized
//! allocation. An optional body limit (used when a response is going to be
//! buffered in memory) wraps the payload phase in a
//! [`GuardedDecoder`](crate::codec::body::GuardedDecoder).

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::{GuardedDecoder, PayloadDecoder};
use crate::codec::header::decode_header_block;
use crate::codec::{BODY_TAG, HEADERS_TAG};
use crate::ensure;
use crate::protocol::{Message, MessageHead, PayloadItem, PayloadSize, ProtocolError};

#[derive(Debug)]
pub struct MessageDecoder {
    max_headers_size: usize,
    body_limit: i64,
    state: DecodeState,
}

#[derive(Debug)]
enum DecodeState {
    /// Waiting for the header-section frame header
    Head,
    /// Waiting for the complete header-section block
    HeadBlock { length: usize },
    /// Delivering body payload items
    Payload(GuardedDecoder<PayloadDecoder>),
}

impl MessageDecoder {
    pub fn new(max_headers_size: usize) -> Self {
        Self { max_headers_size, body_limit: 0, state: DecodeState::Head }
    }

    /// Bounds the number of body bytes this decoder will deliver per
    /// message; zero or below means unbounded.
    pub fn with_body_limit(mut self, body_limit: i64) -> Self {
        self.body_limit = body_limit;
        self
    }
}

impl Decoder for MessageDecoder {
    type Item = Message<(MessageHead, PayloadSize)>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &mut self.state {
                DecodeState::Head => {
                    if src.len() < 8 {
                        return Ok(None);
                    }

                    let mut frame_header = &src[..8];
                    let tag = frame_header.get_u32();
                    let length = frame_header.get_u32() as usize;
                    ensure!(
                        tag == HEADERS_TAG,
                        ProtocolError::violation(format!(
                            "unexpected frame tag: expected {HEADERS_TAG:#010x}, got {tag:#010x}"
                        ))
                    );
                    ensure!(length > 0, ProtocolError::violation("empty header section frame"));
                    ensure!(length <= self.max_headers_size, ProtocolError::length_limit_exceeded(length, self.max_headers_size));

                    src.advance(8);
                    src.reserve(length.saturating_sub(src.len()));
                    self.state = DecodeState::HeadBlock { length };
                }

                DecodeState::HeadBlock { length } => {
                    let length = *length;
                    if src.len() < length {
                        return Ok(None);
                    }

                    let block = src.split_to(length);
                    let (line, headers) = decode_header_block(&block)?;
                    let head = MessageHead::new(line, headers);
                    let payload_size = head.payload_size()?;
                    trace!(?payload_size, "decoded header section");

                    self.state = match PayloadDecoder::for_size(payload_size, BODY_TAG) {
                        Some(decoder) => DecodeState::Payload(GuardedDecoder::new(decoder, self.body_limit)),
                        None => DecodeState::Head,
                    };
                    return Ok(Some(Message::Header((head, payload_size))));
                }

                DecodeState::Payload(decoder) => {
                    return match decoder.decode(src)? {
                        Some(item @ PayloadItem::Chunk(_)) => Ok(Some(Message::Payload(item))),
                        Some(item @ PayloadItem::Eof) => {
                            trace!("finished reading message body");
                            self.state = DecodeState::Head;
                            Ok(Some(Message::Payload(item)))
                        }
                        None => Ok(None),
                    };
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        match &self.state {
            // a clean close between messages is simply the end of the stream
            DecodeState::Head if src.is_empty() => Ok(None),
            DecodeState::Head | DecodeState::HeadBlock { .. } => Err(ProtocolError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside a header section",
            ))),
            DecodeState::Payload(decoder) => Err(decoder.inner().premature_eof_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_frame(block: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"hdrs");
        out.extend_from_slice(&(block.len() as u32).to_be_bytes());
        out.extend_from_slice(block);
        out
    }

    fn body_frame(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"body");
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn fixed_length_message() {
        let mut wire = headers_frame(b"GET,/,\"\",2\naccept,text/plain\n");
        wire.extend_from_slice(b"hi");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        let Message::Header((head, payload_size)) = item else {
            panic!("expected header");
        };
        assert_eq!(head.line, vec!["GET", "/", "", "2"]);
        assert_eq!(head.headers.get("accept").unwrap(), "text/plain");
        assert_eq!(payload_size, PayloadSize::Length(2));

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.into_payload_item().unwrap().as_bytes().unwrap().as_ref(), b"hi");

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.into_payload_item().unwrap().is_eof());
    }

    #[test]
    fn chunk_framed_message_leaves_following_bytes_alone() {
        let mut wire = headers_frame(b"200,\"\",\"\",-1\n");
        wire.extend_from_slice(&body_frame(b"hello"));
        wire.extend_from_slice(&body_frame(b""));
        wire.extend_from_slice(b"TRAILING");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.is_header());

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.into_payload_item().unwrap().as_bytes().unwrap().as_ref(), b"hello");

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.into_payload_item().unwrap().is_eof());
        assert_eq!(&buffer[..], b"TRAILING");
    }

    #[test]
    fn empty_body_goes_straight_back_to_head_phase() {
        let first = headers_frame(b"GET,/,\"\",0\n");
        let second = headers_frame(b"PUT,/x,\"\",0\n");

        let mut wire = first;
        wire.extend_from_slice(&second);
        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        let Message::Header((head, payload_size)) = item else {
            panic!("expected header");
        };
        assert_eq!(head.line[0], "GET");
        assert!(payload_size.is_empty());

        // next message decodes immediately, no body phase in between
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        let Message::Header((head, _)) = item else {
            panic!("expected header");
        };
        assert_eq!(head.line[0], "PUT");
    }

    #[test]
    fn wrong_leading_tag_is_a_violation() {
        let wire = body_frame(b"oops");
        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        let result = decoder.decode(&mut buffer);
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));
    }

    #[test]
    fn oversized_header_frame_is_rejected_before_buffering() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"hdrs");
        wire.extend_from_slice(&100_000u32.to_be_bytes());

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        match decoder.decode(&mut buffer) {
            Err(ProtocolError::LengthLimitExceeded { current_size, max_size }) => {
                assert_eq!(current_size, 100_000);
                assert_eq!(max_size, 8192);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn body_limit_applies_to_delivered_bytes() {
        let mut wire = headers_frame(b"200,\"\",\"\",8\n");
        wire.extend_from_slice(b"12345678");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192).with_body_limit(4);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_header());
        let result = decoder.decode(&mut buffer);
        assert!(matches!(result, Err(ProtocolError::StreamSizeExceeded { max_size: 4 })));
    }

    #[test]
    fn eof_between_messages_is_clean() {
        let mut buffer = BytesMut::new();
        let mut decoder = MessageDecoder::new(8192);
        assert!(decoder.decode_eof(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn eof_inside_fixed_body_reports_shortfall() {
        let mut wire = headers_frame(b"200,\"\",\"\",10\n");
        wire.extend_from_slice(b"abc");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = MessageDecoder::new(8192);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_header());
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.into_payload_item().unwrap().as_bytes().unwrap().as_ref(), b"abc");

        match decoder.decode_eof(&mut buffer) {
            Err(ProtocolError::ContentLengthNotSatisfied { declared, shortfall }) => {
                assert_eq!(declared, 10);
                assert_eq!(shortfall, 7);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn eof_inside_header_section_is_an_io_error() {
        let wire = headers_frame(b"GET,/,\"\",0\n");
        let mut buffer = BytesMut::from(&wire[..6]);
        let mut decoder = MessageDecoder::new(8192);

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        let result = decoder.decode_eof(&mut buffer);
        assert!(matches!(result, Err(ProtocolError::Io { .. })));
    }
}
