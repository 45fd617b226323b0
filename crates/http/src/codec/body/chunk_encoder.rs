//! Encoder for tag/length/value chunk framing.

use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEncoder {
    tag: u32,
    finished: bool,
}

impl ChunkEncoder {
    pub fn new(tag: u32) -> Self {
        Self { tag, finished: false }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.finished {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut data) => {
                // a zero-length frame is the terminator, so empty upstream
                // chunks must not reach the wire
                while data.has_remaining() {
                    let frame_len = cmp::min(data.remaining(), u32::MAX as usize);
                    dst.reserve(8 + frame_len);
                    dst.put_u32(self.tag);
                    dst.put_u32(frame_len as u32);
                    let payload = data.copy_to_bytes(frame_len);
                    dst.extend_from_slice(&payload);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                self.finished = true;
                dst.reserve(8);
                dst.put_u32(self.tag);
                dst.put_u32(0);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const TAG: u32 = 0x626f_6479;

    #[test]
    fn frames_carry_tag_length_and_payload() {
        let mut encoder = ChunkEncoder::new(TAG);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert!(encoder.is_finished());

        let mut expected = Vec::new();
        expected.extend_from_slice(b"body");
        expected.extend_from_slice(&5u32.to_be_bytes());
        expected.extend_from_slice(b"hello");
        expected.extend_from_slice(b"body");
        expected.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(&dst[..], &expected[..]);
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let mut encoder = ChunkEncoder::new(TAG);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        assert!(dst.is_empty());

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"x")), &mut dst).unwrap();
        assert_eq!(dst.len(), 9);
    }

    #[test]
    fn nothing_is_written_after_the_terminator() {
        let mut encoder = ChunkEncoder::new(TAG);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        let terminator_len = dst.len();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"late")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(dst.len(), terminator_len);
    }
}
