//! Unified decoder over the two body framing strategies.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunk_decoder::ChunkDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{PayloadItem, PayloadSize, ProtocolError};

/// Decodes a message body with the strategy its declared content length
/// selected: fixed-length passthrough or tagged chunk frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkDecoder),
}

impl PayloadDecoder {
    pub fn fixed(length: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(length)) }
    }

    pub fn chunked(tag: u32) -> Self {
        Self { kind: Kind::Chunked(ChunkDecoder::new(tag)) }
    }

    /// Picks a decoder for the given payload size; `None` when the message
    /// has no body bytes on the wire.
    pub fn for_size(size: PayloadSize, tag: u32) -> Option<Self> {
        match size {
            PayloadSize::Length(length) => Some(Self::fixed(length)),
            PayloadSize::Chunked => Some(Self::chunked(tag)),
            PayloadSize::Empty => None,
        }
    }

    pub(crate) fn premature_eof_error(&self) -> ProtocolError {
        match &self.kind {
            Kind::Length(decoder) => decoder.premature_eof_error(),
            Kind::Chunked(decoder) => decoder.premature_eof_error(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
        }
    }
}
