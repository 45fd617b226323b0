//! Unified encoder over the two body framing strategies.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::body::chunk_encoder::ChunkEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkEncoder),
}

impl PayloadEncoder {
    pub fn fixed(length: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(length)) }
    }

    pub fn chunked(tag: u32) -> Self {
        Self { kind: Kind::Chunked(ChunkEncoder::new(tag)) }
    }

    /// Picks an encoder for the given payload size.
    ///
    /// An empty payload gets a zero-length fixed encoder rather than no
    /// encoder at all: the body pipeline still runs, contributes no bytes,
    /// and flags a body that produces data despite a declared length of
    /// zero.
    pub fn for_size(size: PayloadSize, tag: u32) -> Self {
        match size {
            PayloadSize::Length(length) => Self::fixed(length),
            PayloadSize::Chunked => Self::chunked(tag),
            PayloadSize::Empty => Self::fixed(0),
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finished(),
            Kind::Chunked(encoder) => encoder.is_finished(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
        }
    }
}
