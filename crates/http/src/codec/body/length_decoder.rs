//! Decoder for bodies with a declared exact byte count.
//!
//! Fixed-length bodies carry no framing of their own: the declared count is
//! the frame. The decoder delivers exactly that many bytes and then signals
//! end of body, leaving anything beyond the count untouched in the backing
//! buffer for whatever follows on the connection.

use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{PayloadItem, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    declared: u64,
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { declared: length, remaining: length }
    }

    /// The error to raise when the backing stream ends before the declared
    /// count was delivered.
    pub(crate) fn premature_eof_error(&self) -> ProtocolError {
        ProtocolError::content_length_not_satisfied(self.declared, self.remaining)
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.remaining -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
