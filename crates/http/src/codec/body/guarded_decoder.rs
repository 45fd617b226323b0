//! Byte-count guard over any payload decoder.
//!
//! A pass-through wrapper that counts the bytes it delivers and aborts with
//! [`ProtocolError::StreamSizeExceeded`] once the running total would go
//! past a configured ceiling. This bounds in-memory buffering of a body
//! without requiring the whole body to be seen first: the failure fires on
//! the first excess chunk.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{PayloadItem, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedDecoder<D> {
    inner: D,
    max_size: u64,
    delivered: u64,
}

impl<D> GuardedDecoder<D> {
    /// Wraps `inner` with the given ceiling; a ceiling of zero or below
    /// disables the guard.
    pub fn new(inner: D, max_size: i64) -> Self {
        Self { inner, max_size: if max_size > 0 { max_size as u64 } else { 0 }, delivered: 0 }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D> Decoder for GuardedDecoder<D>
where
    D: Decoder<Item = PayloadItem, Error = ProtocolError>,
{
    type Item = PayloadItem;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(PayloadItem::Chunk(bytes)) => {
                self.delivered += bytes.len() as u64;
                if self.max_size > 0 && self.delivered > self.max_size {
                    return Err(ProtocolError::stream_size_exceeded(self.max_size));
                }
                Ok(Some(PayloadItem::Chunk(bytes)))
            }
            other => Ok(other),
        }
    }
}
