//! Decoder for tag/length/value chunk framing.
//!
//! An unknown-length body is a sequence of frames, each `[4-byte tag]
//! [4-byte big-endian length][length payload bytes]`, closed by a frame
//! whose length is zero. The tag is a fixed constant per body role; a frame
//! carrying any other tag is a protocol violation, because it means the two
//! sides disagree about where one message ends and the next begins.
//!
//! Payload bytes are handed out as they arrive, so a frame does not have to
//! be buffered whole. Bytes following the terminator are left untouched in
//! the backing buffer: they belong to the next logical unit on the shared
//! connection and must be readable afterwards.

use std::cmp;
use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{PayloadItem, ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Waiting for the 8 bytes of the next frame header
    FrameHeader,
    /// Delivering the payload of the current frame
    Data { remaining: u32 },
    /// Terminator seen; the body is complete
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDecoder {
    expected_tag: u32,
    state: ChunkState,
}

impl ChunkDecoder {
    pub fn new(expected_tag: u32) -> Self {
        Self { expected_tag, state: ChunkState::FrameHeader }
    }

    pub(crate) fn premature_eof_error(&self) -> ProtocolError {
        ProtocolError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed in the middle of body frames"))
    }
}

impl Decoder for ChunkDecoder {
    type Item = PayloadItem;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkState::End => return Ok(Some(PayloadItem::Eof)),

                ChunkState::FrameHeader => {
                    if src.len() < 8 {
                        return Ok(None);
                    }

                    let mut header = &src[..8];
                    let tag = header.get_u32();
                    let length = header.get_u32();
                    ensure!(
                        tag == self.expected_tag,
                        ProtocolError::violation(format!(
                            "unexpected frame tag: expected {:#010x}, got {tag:#010x}",
                            self.expected_tag
                        ))
                    );
                    src.advance(8);

                    if length == 0 {
                        trace!("read body terminator frame");
                        self.state = ChunkState::End;
                        return Ok(Some(PayloadItem::Eof));
                    }

                    trace!(length, "read body frame header");
                    self.state = ChunkState::Data { remaining: length };
                }

                ChunkState::Data { remaining } => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = cmp::min(remaining as usize, src.len());
                    let bytes = src.split_to(len).freeze();
                    let left = remaining - len as u32;
                    self.state = if left == 0 { ChunkState::FrameHeader } else { ChunkState::Data { remaining: left } };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: u32 = 0x626f_6479; // "body"

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&TAG.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn frames_then_terminator_then_leftover() {
        let mut wire = frame(b"hello");
        wire.extend_from_slice(&frame(b", world"));
        wire.extend_from_slice(&frame(b""));
        wire.extend_from_slice(b"NEXT-MESSAGE");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = ChunkDecoder::new(TAG);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"hello");

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b", world");

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        // post-terminator bytes stay for the next reader, uncorrupted
        assert_eq!(&buffer[..], b"NEXT-MESSAGE");

        // termination is idempotent
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(&buffer[..], b"NEXT-MESSAGE");
    }

    #[test]
    fn partial_frame_header_waits_for_more() {
        let wire = frame(b"abc");
        let mut buffer = BytesMut::from(&wire[..5]);
        let mut decoder = ChunkDecoder::new(TAG);

        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&wire[5..]);
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn frame_payload_can_arrive_in_pieces() {
        let wire = frame(b"abcdef");
        let mut buffer = BytesMut::from(&wire[..10]); // header + "ab"
        let mut decoder = ChunkDecoder::new(TAG);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"ab");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&wire[10..]);
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"cdef");
    }

    #[test]
    fn wrong_tag_is_a_violation() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&0x6864_7273u32.to_be_bytes()); // "hdrs"
        wire.extend_from_slice(&5u32.to_be_bytes());
        wire.extend_from_slice(b"hello");

        let mut buffer = BytesMut::from(&wire[..]);
        let mut decoder = ChunkDecoder::new(TAG);

        let result = decoder.decode(&mut buffer);
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));
    }
}
